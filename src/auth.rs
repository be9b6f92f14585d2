//! Session stub. The dashboard does not enforce authentication: a session
//! starts authenticated and only `logout` changes that.

mod token;

pub use token::Token;

use log::info;

use crate::selection::ProjectSelection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    authenticated: bool,
    organization: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            authenticated: true,
            organization: None,
        }
    }
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn organization(&self) -> Option<&str> {
        self.organization.as_deref()
    }

    pub fn login(&mut self, organization: &str) {
        info!("Session opened for organization: {organization}");
        self.authenticated = true;
        self.organization = Some(organization.to_string());
    }

    /// Ends the session and clears the project selection.
    pub fn logout(&mut self, selection: &ProjectSelection) {
        info!("Session closed");
        self.authenticated = false;
        self.organization = None;
        selection.set(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_starts_authenticated() {
        let session = Session::default();

        assert!(session.is_authenticated());
        assert_eq!(session.organization(), None);
    }

    #[test]
    fn test_login_records_organization() {
        let mut session = Session::default();
        session.login("DefaultOrg");

        assert!(session.is_authenticated());
        assert_eq!(session.organization(), Some("DefaultOrg"));
    }

    #[test]
    fn test_logout_resets_selection() {
        let selection = ProjectSelection::new();
        selection.set(Some("1".to_string()));

        let mut session = Session::default();
        session.login("DefaultOrg");
        session.logout(&selection);

        assert!(!session.is_authenticated());
        assert_eq!(session.organization(), None);
        assert_eq!(selection.get(), None);
    }
}
