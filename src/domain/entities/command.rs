use super::User;

/// Chat a command originated from. Title and username are only present
/// for group/channel chats, so both are optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatContext {
    pub id: String,
    pub title: Option<String>,
    pub username: Option<String>,
}

impl ChatContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            username: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// An inbound command, built by a transport adapter per inbound event
/// and consumed exactly once by a handler.
///
/// Every piece of metadata besides the name may be absent; the transport
/// attaches whatever the platform supplied.
#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
    pub invoker: Option<User>,
    pub chat: Option<ChatContext>,
    pub poll_id: Option<String>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            invoker: None,
            chat: None,
            poll_id: None,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_invoker(mut self, user: User) -> Self {
        self.invoker = Some(user);
        self
    }

    pub fn with_chat(mut self, chat: ChatContext) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_poll_id(mut self, poll_id: impl Into<String>) -> Self {
        self.poll_id = Some(poll_id.into());
        self
    }

    /// Chat id to reply to, when the command came from a reply-capable chat
    pub fn reply_chat_id(&self) -> Option<&str> {
        self.chat.as_ref().map(|c| c.id.as_str())
    }
}
