//! Admin console state.

use crate::models::{Admin, Ban, Report};
use uuid::Uuid;

/// A pending report with the reported content resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub report: Report,
    /// Author of the reported content, when it still exists.
    pub author_id: Option<Uuid>,
    /// Short excerpt of the reported content.
    pub preview: Option<String>,
}

/// List of the console that has the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminPane {
    #[default]
    Reports,
    Bans,
    Admins,
}

impl AdminPane {
    pub fn next(self) -> Self {
        match self {
            AdminPane::Reports => AdminPane::Bans,
            AdminPane::Bans => AdminPane::Admins,
            AdminPane::Admins => AdminPane::Reports,
        }
    }
}

#[derive(Debug, Default)]
pub struct AdminState {
    /// The signed-in user's own grant.
    pub me: Option<Admin>,
    pub reports: Vec<ReportRow>,
    /// Bans still in force.
    pub bans: Vec<Ban>,
    pub admins: Vec<Admin>,
    pub pane: AdminPane,
    pub selected_index: Option<usize>,
    pub ban_index: Option<usize>,
    pub admin_index: Option<usize>,
    pub loading: bool,
}

impl AdminState {
    pub fn selected(&self) -> Option<&ReportRow> {
        self.selected_index.and_then(|i| self.reports.get(i))
    }

    pub fn selected_ban(&self) -> Option<&Ban> {
        self.ban_index.and_then(|i| self.bans.get(i))
    }

    pub fn selected_admin(&self) -> Option<&Admin> {
        self.admin_index.and_then(|i| self.admins.get(i))
    }

    /// Length of the focused list.
    pub fn pane_len(&self) -> usize {
        match self.pane {
            AdminPane::Reports => self.reports.len(),
            AdminPane::Bans => self.bans.len(),
            AdminPane::Admins => self.admins.len(),
        }
    }

    pub fn pane_selection_mut(&mut self) -> &mut Option<usize> {
        match self.pane {
            AdminPane::Reports => &mut self.selected_index,
            AdminPane::Bans => &mut self.ban_index,
            AdminPane::Admins => &mut self.admin_index,
        }
    }
}
