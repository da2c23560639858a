use std::fmt;
use std::str::FromStr;

/// Transport strategy a domain is reached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Queue,
    Rpc,
    Http,
}

impl TransportKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Queue => "queue",
            TransportKind::Rpc => "rpc",
            TransportKind::Http => "http",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queue" => Ok(TransportKind::Queue),
            "rpc" | "tcp" => Ok(TransportKind::Rpc),
            "http" => Ok(TransportKind::Http),
            other => Err(format!("unknown transport '{other}' (expected queue, rpc or http)")),
        }
    }
}

/// One independently deployed backend service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendDomain {
    Auth,
    Expense,
    Budget,
    Blog,
    Subscription,
    Notification,
    Ocr,
    Ai,
    Payment,
}

impl BackendDomain {
    pub const COUNT: usize = 9;

    pub const ALL: [BackendDomain; Self::COUNT] = [
        BackendDomain::Auth,
        BackendDomain::Expense,
        BackendDomain::Budget,
        BackendDomain::Blog,
        BackendDomain::Subscription,
        BackendDomain::Notification,
        BackendDomain::Ocr,
        BackendDomain::Ai,
        BackendDomain::Payment,
    ];

    pub const fn index(&self) -> usize {
        *self as usize
    }

    pub const fn name(&self) -> &'static str {
        match self {
            BackendDomain::Auth => "auth",
            BackendDomain::Expense => "expense",
            BackendDomain::Budget => "budget",
            BackendDomain::Blog => "blog",
            BackendDomain::Subscription => "subscription",
            BackendDomain::Notification => "notification",
            BackendDomain::Ocr => "ocr",
            BackendDomain::Ai => "ai",
            BackendDomain::Payment => "payment",
        }
    }

    /// Prefix of the `{PREFIX}_SERVICE_*` environment variables.
    pub fn env_prefix(&self) -> String {
        self.name().to_ascii_uppercase()
    }

    pub fn service_name(&self) -> String {
        format!("{}-service", self.name())
    }

    pub fn default_queue(&self) -> String {
        format!("{}_queue", self.name())
    }

    pub const fn default_transport(&self) -> TransportKind {
        match self {
            BackendDomain::Auth
            | BackendDomain::Subscription
            | BackendDomain::Notification
            | BackendDomain::Payment => TransportKind::Http,
            BackendDomain::Budget => TransportKind::Rpc,
            BackendDomain::Expense
            | BackendDomain::Blog
            | BackendDomain::Ocr
            | BackendDomain::Ai => TransportKind::Queue,
        }
    }

    pub const fn default_port(&self) -> u16 {
        match self {
            BackendDomain::Auth => 3001,
            BackendDomain::Expense => 3002,
            BackendDomain::Budget => 3003,
            BackendDomain::Blog => 3004,
            BackendDomain::Subscription => 3005,
            BackendDomain::Notification => 3006,
            BackendDomain::Ocr => 3007,
            BackendDomain::Ai => 3008,
            BackendDomain::Payment => 3009,
        }
    }

    /// Path segment under `/api/v1` on the domain's HTTP service.
    pub const fn http_segment(&self) -> &'static str {
        match self {
            BackendDomain::Auth => "auth",
            BackendDomain::Expense => "expenses",
            BackendDomain::Budget => "budgets",
            BackendDomain::Blog => "blogs",
            BackendDomain::Subscription => "subscriptions",
            BackendDomain::Notification => "notifications",
            BackendDomain::Ocr => "ocr",
            BackendDomain::Ai => "ai",
            BackendDomain::Payment => "payments",
        }
    }
}

impl fmt::Display for BackendDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
