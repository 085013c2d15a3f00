//! Side effects the session asks the runtime to perform.

/// What an execution dispatch fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTarget {
    Home,
    Active,
    Sql(String),
}

/// Administrative call against a backend process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendAction {
    Terminate,
    Cancel,
}

impl BackendAction {
    /// Prompt shown while the action waits for y/n.
    pub fn confirm_prompt(self, pid: i32) -> String {
        match self {
            Self::Terminate => format!("Terminate PID {pid}? (y/n)"),
            Self::Cancel => format!("Cancel query on PID {pid}? (y/n)"),
        }
    }

    pub fn done_message(self, pid: i32) -> String {
        match self {
            Self::Terminate => format!("Terminated backend PID {pid}"),
            Self::Cancel => format!("Cancelled query on PID {pid}"),
        }
    }
}

/// Actions that require the runtime to perform side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Run `target`; the completion carries `generation` back.
    Execute { generation: u64, target: QueryTarget },
    Backend { pid: i32, action: BackendAction },
    GenerateSql {
        request: u64,
        prompt: String,
        current_sql: Option<String>,
    },
    CopyToClipboard(String),
    OpenShell,
}
