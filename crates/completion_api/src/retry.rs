/// Re-authentications allowed per call after the first 401/403.
pub const DEFAULT_AUTH_RETRIES: u32 = 2;
/// Extra attempts allowed per call after a transport timeout.
pub const DEFAULT_TRANSPORT_RETRIES: u32 = 2;

/// Ceilings for the two independent retry classes of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudgets {
    pub auth: u32,
    pub transport: u32,
}

impl Default for RetryBudgets {
    fn default() -> Self {
        Self {
            auth: DEFAULT_AUTH_RETRIES,
            transport: DEFAULT_TRANSPORT_RETRIES,
        }
    }
}

/// Per-call counters. The two classes never share a counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    auth_retries: u32,
    timeouts: u32,
}

impl RetryState {
    /// Counts an authentication rejection; `true` when another attempt is allowed.
    pub fn record_auth_failure(&mut self, budgets: RetryBudgets) -> bool {
        if self.auth_retries < budgets.auth {
            self.auth_retries += 1;
            true
        } else {
            false
        }
    }

    /// Counts a timed-out attempt; `true` when another attempt is allowed.
    ///
    /// A budget of zero fails on the first timeout.
    pub fn record_timeout(&mut self, budgets: RetryBudgets) -> bool {
        self.timeouts += 1;
        self.timeouts <= budgets.transport
    }

    pub fn auth_retries(&self) -> u32 {
        self.auth_retries
    }

    pub fn timeouts(&self) -> u32 {
        self.timeouts
    }
}
