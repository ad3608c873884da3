//! Business-flow flag recorder
//!
//! Every marker is a one-way transition: the first write in a session wins and
//! later writes are ignored until the session is reset.

use crate::types::FlowFlags;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default)]
pub struct FlowRecorder {
    flags: FlowFlags,
}

impl FlowRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if this call set the login time
    pub fn mark_login(&mut self, at: DateTime<Utc>) -> bool {
        set_once(&mut self.flags.login_time, at)
    }

    /// Returns true if this call broke the fixed deposit
    pub fn mark_fd_broken(&mut self, at: DateTime<Utc>) -> bool {
        if self.flags.fd_broken {
            return false;
        }
        self.flags.fd_broken = true;
        self.flags.fd_time = Some(at);
        true
    }

    /// Returns true if this call recorded the loan
    pub fn mark_loan_taken(&mut self, at: DateTime<Utc>) -> bool {
        if self.flags.loan_taken {
            return false;
        }
        self.flags.loan_taken = true;
        self.flags.loan_time = Some(at);
        true
    }

    pub fn set_transaction_amount(&mut self, amount: &str) -> bool {
        if self.flags.transaction_amount.is_some() {
            return false;
        }
        self.flags.transaction_amount = Some(amount.to_string());
        true
    }

    pub fn mark_transaction_start(&mut self, at: DateTime<Utc>) -> bool {
        set_once(&mut self.flags.transaction_start_time, at)
    }

    pub fn mark_transaction_end(&mut self, at: DateTime<Utc>) -> bool {
        set_once(&mut self.flags.transaction_end_time, at)
    }

    pub fn flags(&self) -> &FlowFlags {
        &self.flags
    }

    pub fn reset(&mut self) {
        self.flags = FlowFlags::default();
    }

    pub fn into_flags(self) -> FlowFlags {
        self.flags
    }
}

fn set_once(slot: &mut Option<DateTime<Utc>>, at: DateTime<Utc>) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(at);
    true
}
