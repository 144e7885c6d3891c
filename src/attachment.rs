use crate::context::EnrichmentContext;
use crate::message::NormalizedMessage;
use crate::record::LogRecord;
use crate::slack::SlackConfig;
use serde::Serialize;

/// Attachment parts where Slack renders markdown.
pub const MARKDOWN_IN: [&str; 2] = ["fields", "text"];

/// Encode `&`, `<` and `>` as HTML entities; quotes are left untouched.
pub fn encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Store `value` into `slot` unless it is absent or empty.
pub(crate) fn set_if_present<T, V>(slot: &mut Option<T>, value: Option<V>)
where
    V: AsRef<str> + Into<T>,
{
    if let Some(value) = value {
        if !value.as_ref().is_empty() {
            *slot = Some(value.into());
        }
    }
}

/// One titled value shown in the attachment's field grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub title: &'static str,
    pub value: String,
    pub short: bool,
}

/// Slack message attachment describing a single log record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub fallback: String,
    pub title: String,
    pub fields: Vec<Field>,
    pub text: String,
    pub footer: String,
    pub ts: i64,
    pub mrkdwn_in: [&'static str; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Wrap {
    Plain,
    Inline,
    Block,
}

fn code_block(value: &str) -> String {
    format!("```\n{}\n```", value)
}

/// Turns records into [`Attachment`]s using a sink's static configuration.
pub struct AttachmentFormatter<'a> {
    config: &'a SlackConfig,
}

impl<'a> AttachmentFormatter<'a> {
    pub fn new(config: &'a SlackConfig) -> Self {
        AttachmentFormatter { config }
    }

    fn escape(&self, value: &str) -> String {
        (self.config.escaper)(value)
    }

    /// Build the attachment for `record` as seen from `context`.
    pub fn format(&self, record: &LogRecord, context: &EnrichmentContext) -> Attachment {
        let message = NormalizedMessage::from_record(record);
        let prefix = self.config.prefix.as_ref().map(|prefix| prefix(&message));
        let level = message.level.name();

        let summary = format!(
            "{}[{}][{}] {}",
            prefix.as_deref().unwrap_or_default(),
            level,
            message.category,
            message.text
        );

        let mut attachment = Attachment {
            fallback: self.escape(&summary),
            title: message.level.title(),
            fields: Vec::new(),
            text: code_block(&self.escape(&message.text)),
            footer: self.config.app_id.clone(),
            ts: message.timestamp.round() as i64,
            mrkdwn_in: MARKDOWN_IN,
            author_name: None,
            author_link: None,
            color: None,
        };

        if context.is_background {
            attachment.author_name = Some(context.command_line.clone().unwrap_or_default());
        } else if let Some(url) = &context.current_url {
            attachment.author_name = Some(url.clone());
            attachment.author_link = Some(url.clone());
        }

        set_if_present(
            &mut attachment.color,
            self.config.colors.get(&message.level).map(String::as_str),
        );

        let stack_trace = message.stack_trace();
        // Level names are fixed identifiers and bypass the escaper.
        attachment.fields.push(Field { title: "Level", value: level.to_string(), short: true });
        self.push_field(&mut attachment, "Category", Some(message.category.as_str()), true, Wrap::Inline);
        self.push_field(&mut attachment, "Prefix", prefix.as_deref(), true, Wrap::Inline);
        self.push_field(&mut attachment, "User IP", context.user_ip.as_deref(), true, Wrap::Plain);
        self.push_field(&mut attachment, "User ID", context.user_id.as_deref(), true, Wrap::Plain);
        self.push_field(&mut attachment, "Session ID", context.session_id.as_deref(), true, Wrap::Inline);
        self.push_field(&mut attachment, "Stack Trace", Some(stack_trace.as_str()), false, Wrap::Block);

        attachment
    }

    fn push_field(
        &self,
        attachment: &mut Attachment,
        title: &'static str,
        value: Option<&str>,
        short: bool,
        wrap: Wrap,
    ) {
        let value = match value {
            Some(value) => self.escape(value),
            None => return,
        };
        if value.is_empty() {
            return;
        }
        let value = match wrap {
            Wrap::Plain => value,
            Wrap::Inline => format!("`{}`", value),
            Wrap::Block => code_block(&value),
        };
        attachment.fields.push(Field { title, value, short });
    }
}
