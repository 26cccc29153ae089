// service/session.rs
// Caller-owned session state, passed into every service call

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub page: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    pub user: Option<String>,
    pub visits: Vec<VisitRecord>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn record_visit(&mut self, page: &str) {
        self.visits.push(VisitRecord {
            page: page.to_string(),
            at: Utc::now(),
        });
    }

    pub fn visit_count(&self, page: &str) -> usize {
        self.visits.iter().filter(|v| v.page == page).count()
    }
}
