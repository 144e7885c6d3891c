use std::ffi::OsString;

/// Read-only access to the execution context a record was logged in.
///
/// Every lookup is best-effort and must be passive: implementations never
/// start a session or force authentication just to answer a query. Any
/// unknown value is reported as `None`. Queried once per formatted record.
pub trait ContextProvider: Send + Sync {
    /// `true` for console/background invocations, `false` inside a request.
    fn is_background(&self) -> bool;

    /// Invoked command and its arguments.
    fn command_line(&self) -> Option<String> {
        None
    }

    /// Absolute URL of the current request, query included.
    fn current_url(&self) -> Option<String> {
        None
    }

    fn user_ip(&self) -> Option<String> {
        None
    }

    /// Id of an already resolved identity.
    fn user_id(&self) -> Option<String> {
        None
    }

    /// Id of an already active session.
    fn session_id(&self) -> Option<String> {
        None
    }
}

/// Snapshot of the context signals used to enrich one attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentContext {
    pub is_background: bool,
    pub command_line: Option<String>,
    pub current_url: Option<String>,
    pub user_ip: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

impl EnrichmentContext {
    /// Query `provider` for everything an attachment can show.
    ///
    /// Background invocations always get a command line (empty when the
    /// provider cannot tell); request-only signals are not asked for.
    pub fn collect(provider: &dyn ContextProvider) -> Self {
        if provider.is_background() {
            EnrichmentContext {
                is_background: true,
                command_line: Some(provider.command_line().unwrap_or_default()),
                current_url: None,
                user_ip: None,
                user_id: provider.user_id(),
                session_id: provider.session_id(),
            }
        } else {
            EnrichmentContext {
                is_background: false,
                command_line: None,
                current_url: provider.current_url(),
                user_ip: provider.user_ip(),
                user_id: provider.user_id(),
                session_id: provider.session_id(),
            }
        }
    }
}

/// Context of the running process itself: a background invocation whose
/// command line is taken from `std::env::args_os`.
#[derive(Debug, Clone, Default)]
pub struct ProcessContext;

impl ContextProvider for ProcessContext {
    fn is_background(&self) -> bool {
        true
    }

    fn command_line(&self) -> Option<String> {
        Some(join_args(std::env::args_os()))
    }
}

/// Join process arguments with spaces, replacing invalid Unicode with U+FFFD.
fn join_args<I>(args: I) -> String
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<String>>()
        .join(" ")
}

/// Context captured from an interactive request by the embedding
/// application (e.g. in a middleware) and handed to the sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub url: Option<String>,
    pub user_ip: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

impl RequestContext {
    pub fn new(url: impl Into<String>) -> Self {
        RequestContext {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_user_ip(mut self, ip: impl Into<String>) -> Self {
        self.user_ip = Some(ip.into());
        self
    }

    pub fn with_user_id(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }
}

impl ContextProvider for RequestContext {
    fn is_background(&self) -> bool {
        false
    }

    fn current_url(&self) -> Option<String> {
        self.url.clone()
    }

    fn user_ip(&self) -> Option<String> {
        self.user_ip.clone()
    }

    fn user_id(&self) -> Option<String> {
        self.user_id.clone()
    }

    fn session_id(&self) -> Option<String> {
        self.session_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Console {
        argv: Option<&'static str>,
    }

    impl ContextProvider for Console {
        fn is_background(&self) -> bool {
            true
        }

        fn command_line(&self) -> Option<String> {
            self.argv.map(str::to_string)
        }

        fn current_url(&self) -> Option<String> {
            Some("http://example.com/".to_string())
        }
    }

    #[test]
    fn background_context_carries_command_line_only() {
        let ctx = EnrichmentContext::collect(&Console { argv: Some("cmd --arg1 arg2") });
        assert!(ctx.is_background);
        assert_eq!(ctx.command_line.as_deref(), Some("cmd --arg1 arg2"));
        assert_eq!(ctx.current_url, None);
        assert_eq!(ctx.user_ip, None);
    }

    #[test]
    fn missing_command_line_degrades_to_empty() {
        let ctx = EnrichmentContext::collect(&Console { argv: None });
        assert_eq!(ctx.command_line.as_deref(), Some(""));
    }

    #[test]
    fn request_context_exposes_all_signals() {
        let request = RequestContext::new("http://example.com/index.php?r=site")
            .with_user_ip("0.0.0.0")
            .with_user_id("userId")
            .with_session_id("session_id");
        let ctx = EnrichmentContext::collect(&request);

        assert!(!ctx.is_background);
        assert_eq!(ctx.command_line, None);
        assert_eq!(ctx.current_url.as_deref(), Some("http://example.com/index.php?r=site"));
        assert_eq!(ctx.user_ip.as_deref(), Some("0.0.0.0"));
        assert_eq!(ctx.user_id.as_deref(), Some("userId"));
        assert_eq!(ctx.session_id.as_deref(), Some("session_id"));
    }

    #[test]
    fn absent_user_and_session_stay_absent() {
        let ctx = EnrichmentContext::collect(&RequestContext::new("http://example.com/"));
        assert_eq!(ctx.user_id, None);
        assert_eq!(ctx.session_id, None);
    }

    #[test]
    fn process_context_is_background() {
        let ctx = EnrichmentContext::collect(&ProcessContext);
        assert!(ctx.is_background);
        assert!(ctx.command_line.is_some());
    }

    #[test]
    fn args_are_joined_with_spaces() {
        let args = ["yii", "migrate/up", "--interactive=0"].map(OsString::from);
        assert_eq!(join_args(args), "yii migrate/up --interactive=0");
        assert_eq!(join_args(Vec::<OsString>::new()), "");
    }

    #[cfg(unix)]
    #[test]
    fn invalid_unicode_args_are_replaced_not_fatal() {
        use std::os::unix::ffi::OsStringExt;

        let args = vec![OsString::from("worker"), OsString::from_vec(vec![b'o', 0xff])];
        assert_eq!(join_args(args), "worker o\u{FFFD}");
    }
}
