//! Site header: section links plus the auth-dependent buttons.

use crate::provider::User;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavLink {
    pub label: &'static str,
    pub href: &'static str,
}

pub const SECTION_LINKS: [NavLink; 4] = [
    NavLink {
        label: "Features",
        href: "/#features",
    },
    NavLink {
        label: "Demo",
        href: "/#demo",
    },
    NavLink {
        label: "Testimonials",
        href: "/#testimonials",
    },
    NavLink {
        label: "Pricing",
        href: "/#pricing",
    },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallToAction {
    Dashboard,
    SignIn,
}

impl CallToAction {
    #[must_use]
    pub const fn for_user(user: Option<&User>) -> Self {
        match user {
            Some(_) => Self::Dashboard,
            None => Self::SignIn,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::SignIn => "Login",
        }
    }

    #[must_use]
    pub const fn href(self) -> &'static str {
        match self {
            Self::Dashboard => "/dashboard",
            Self::SignIn => "/login",
        }
    }
}

/// Header state for one render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chrome {
    pub links: &'static [NavLink],
    /// `None` on the login page when signed out.
    pub call_to_action: Option<CallToAction>,
    pub show_sign_out: bool,
}

impl Chrome {
    #[must_use]
    pub fn for_user(user: Option<&User>, path: &str) -> Self {
        let call_to_action = CallToAction::for_user(user);
        let hide = call_to_action == CallToAction::SignIn && path == "/login";
        Self {
            links: &SECTION_LINKS,
            call_to_action: (!hide).then_some(call_to_action),
            show_sign_out: user.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Metadata;

    fn user() -> User {
        User {
            id: "1".to_string(),
            email: Some("chef@example.com".to_string()),
            user_metadata: Metadata::new(),
        }
    }

    #[test]
    fn signed_in_shows_dashboard_and_sign_out() {
        let user = user();
        let chrome = Chrome::for_user(Some(&user), "/");
        assert_eq!(chrome.call_to_action, Some(CallToAction::Dashboard));
        assert!(chrome.show_sign_out);
        assert_eq!(chrome.links.len(), 4);
    }

    #[test]
    fn signed_out_shows_login_except_on_login_page() {
        let chrome = Chrome::for_user(None, "/");
        assert_eq!(chrome.call_to_action.map(CallToAction::href), Some("/login"));
        assert!(!chrome.show_sign_out);
        assert_eq!(Chrome::for_user(None, "/login").call_to_action, None);
    }
}
