use crate::{
    error::{ClientError, ClientResult},
    log::Log,
    notice::Notices,
    rate_limit::{Cooldown, Delay},
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use time::{format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime};

const TRANSCRIPT_CAPACITY: usize = 500;
pub const SEND_LABEL: &str = "Send party invite";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

/// Anything but `female` reads as male, including null.
impl From<Option<String>> for Gender {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(value) if value.eq_ignore_ascii_case("female") => Gender::Female,
            _ => Gender::Male,
        }
    }
}

impl Gender {
    pub fn toggled(self) -> Self {
        match self {
            Gender::Male => Gender::Female,
            Gender::Female => Gender::Male,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

/// Local user's chat identity, persisted across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatProfile {
    pub nickname: String,
    #[serde(rename = "avatar", default)]
    pub avatar_url: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub hide_avatar: bool,
}

impl ChatProfile {
    pub fn generated() -> Self {
        Self {
            nickname: generated_nickname(),
            avatar_url: String::new(),
            gender: Gender::Male,
            hide_avatar: false,
        }
    }

    /// Trims text fields and guarantees a non-empty nickname.
    pub fn normalized(mut self) -> Self {
        self.nickname = self.nickname.trim().to_string();
        if self.nickname.is_empty() {
            self.nickname = generated_nickname();
        }
        self.avatar_url = self.avatar_url.trim().to_string();
        self
    }
}

/// Roster entry pushed by the server. Fields may be blank before a user's first profile frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatUser {
    pub nickname: String,
    #[serde(rename = "avatar")]
    pub avatar_url: String,
    pub gender: Gender,
    pub hide_avatar: bool,
}

impl ChatUser {
    pub fn visible_avatar(&self) -> Option<&str> {
        (!self.hide_avatar && !self.avatar_url.is_empty()).then_some(self.avatar_url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub profile: ChatUser,
    pub content: String,
    pub time: Option<OffsetDateTime>,
    pub raw_time: String,
}

impl ChatMessage {
    pub fn time_label(&self) -> String {
        let format = format_description!("[hour]:[minute]:[second]");
        self.time
            .and_then(|time| time.format(&format).ok())
            .unwrap_or_else(|| self.raw_time.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Open,
    Reconnecting,
}

impl SessionState {
    pub fn label(self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Open => "online",
            SessionState::Reconnecting => "reconnecting",
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", content = "content", rename_all = "camelCase")]
enum OutboundFrame<'a> {
    UpdateProfile(&'a ChatProfile),
    ChatMessage(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    ChatMessage(ChatMessage),
    UserList(Vec<ChatUser>),
    Unknown(String),
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: serde_json::Value,
    #[serde(default)]
    profile: Option<ChatUser>,
    #[serde(default)]
    time: Option<String>,
}

pub fn parse_frame(raw: &str) -> ClientResult<InboundFrame> {
    let frame: RawFrame =
        serde_json::from_str(raw).map_err(|err| ClientError::Protocol(err.to_string()))?;
    match frame.kind.as_str() {
        "chatMessage" => {
            let serde_json::Value::String(content) = frame.content else {
                return Err(ClientError::Protocol(
                    "chatMessage content is not a string".to_string(),
                ));
            };
            let raw_time = frame.time.unwrap_or_default();
            let time = OffsetDateTime::parse(&raw_time, &Rfc3339).ok();
            Ok(InboundFrame::ChatMessage(ChatMessage {
                profile: frame.profile.unwrap_or_default(),
                content,
                time,
                raw_time,
            }))
        }
        "userList" => {
            if frame.content.is_null() {
                return Ok(InboundFrame::UserList(Vec::new()));
            }
            let users = serde_json::from_value(frame.content)
                .map_err(|err| ClientError::Protocol(err.to_string()))?;
            Ok(InboundFrame::UserList(users))
        }
        _ => Ok(InboundFrame::Unknown(frame.kind)),
    }
}

/// The four invite fields picked in the send form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartyInvite {
    pub main_channel: String,
    pub sub_channel: String,
    pub room: String,
    pub game_mode: String,
}

impl PartyInvite {
    pub fn validate(&self) -> ClientResult<()> {
        if self.room.is_empty() || !self.room.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(ClientError::Validation(
                "Enter a valid room number".to_string(),
            ));
        }
        Ok(())
    }

    pub fn render(&self, template: &str) -> String {
        template
            .replace("{main}", &self.main_channel)
            .replace("{sub}", &self.sub_channel)
            .replace("{room}", &self.room)
            .replace("{mode}", &self.game_mode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Frame(String),
    Closed,
    Error(String),
}

/// Event from the socket worker, tagged with the connection attempt it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportMessage {
    pub generation: u64,
    pub event: TransportEvent,
}

/// Bidirectional framed socket. Events come back asynchronously as [`TransportMessage`]s.
pub trait Transport {
    fn connect(&mut self, url: &str, generation: u64);
    fn send(&mut self, frame: String) -> ClientResult<()>;
    fn close(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self, url: &str, generation: u64) {
        (**self).connect(url, generation)
    }

    fn send(&mut self, frame: String) -> ClientResult<()> {
        (**self).send(frame)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub url: String,
    pub reconnect_delay: Duration,
    pub cooldown_secs: u32,
    pub invite_template: String,
}

/// Session-owned state: the local profile, transcript and roster.
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub profile: ChatProfile,
    pub transcript: Vec<ChatMessage>,
    pub roster: Vec<ChatUser>,
    /// Lines the view is scrolled above the newest message. A new message resets it.
    pub scroll_back: usize,
}

impl ChatContext {
    pub fn new(profile: ChatProfile) -> Self {
        Self {
            profile,
            transcript: Vec::new(),
            roster: Vec::new(),
            scroll_back: 0,
        }
    }

    /// Moves the view by `lines`; positive goes toward older messages.
    fn scroll(&mut self, lines: isize) {
        let limit = self.transcript.len().saturating_sub(1);
        self.scroll_back = self.scroll_back.saturating_add_signed(lines).min(limit);
    }

    fn append(&mut self, message: ChatMessage) {
        self.transcript.push(message);
        if self.transcript.len() > TRANSCRIPT_CAPACITY {
            let overflow = self.transcript.len() - TRANSCRIPT_CAPACITY;
            self.transcript.drain(0..overflow);
        }
        self.scroll_back = 0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Open,
    Transport(TransportMessage),
    Tick(Duration),
    ProfileSaved(ChatProfile),
    SendInvite(PartyInvite),
    Scroll(isize),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    Handled,
    Sent,
    Rejected(ClientError),
}

/// Owns the realtime session. All inputs go through [`ChatSession::handle`], one at a time.
pub struct ChatSession<T: Transport> {
    settings: ChatSettings,
    transport: T,
    state: SessionState,
    generation: u64,
    reconnect: Delay,
    cooldown: Cooldown,
    context: ChatContext,
    log: Log,
}

impl<T: Transport> ChatSession<T> {
    pub fn new(settings: ChatSettings, transport: T, profile: ChatProfile, log: Log) -> Self {
        let reconnect = Delay::new(settings.reconnect_delay);
        let cooldown = Cooldown::new(settings.cooldown_secs);
        Self {
            settings,
            transport,
            state: SessionState::Disconnected,
            generation: 0,
            reconnect,
            cooldown,
            context: ChatContext::new(profile),
            log,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> &ChatContext {
        &self.context
    }

    pub fn cooldown(&self) -> &Cooldown {
        &self.cooldown
    }

    pub fn send_label(&self) -> String {
        self.cooldown.label(SEND_LABEL)
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn handle(&mut self, input: ChatInput, notices: &mut Notices) -> ChatReply {
        match input {
            ChatInput::Open => {
                if self.state == SessionState::Disconnected {
                    self.connect();
                }
                ChatReply::Handled
            }
            ChatInput::Transport(message) => {
                if message.generation == self.generation {
                    self.on_transport(message.event, notices);
                }
                ChatReply::Handled
            }
            ChatInput::Tick(elapsed) => {
                self.cooldown.advance(elapsed);
                if self.reconnect.advance(elapsed) && self.state == SessionState::Reconnecting {
                    self.connect();
                }
                ChatReply::Handled
            }
            ChatInput::ProfileSaved(profile) => {
                self.context.profile = profile;
                if self.state == SessionState::Open {
                    self.send_profile();
                }
                ChatReply::Handled
            }
            ChatInput::SendInvite(invite) => self.send_invite(&invite, notices),
            ChatInput::Scroll(lines) => {
                self.context.scroll(lines);
                ChatReply::Handled
            }
            ChatInput::Shutdown => {
                self.reconnect.cancel();
                if self.state != SessionState::Disconnected {
                    self.transport.close();
                    self.log.info("Chat session closed");
                }
                self.state = SessionState::Disconnected;
                self.generation += 1;
                ChatReply::Handled
            }
        }
    }

    fn connect(&mut self) {
        self.generation += 1;
        self.state = SessionState::Connecting;
        self.log.info(format!("Connecting to chat: {}", self.settings.url));
        self.transport.connect(&self.settings.url, self.generation);
    }

    fn on_transport(&mut self, event: TransportEvent, notices: &mut Notices) {
        match event {
            TransportEvent::Opened => {
                if self.state != SessionState::Connecting {
                    return;
                }
                self.send_profile();
                self.state = SessionState::Open;
                self.log.info("Chat connected");
                notices.success("Connected to the chat room");
            }
            TransportEvent::Frame(raw) => {
                if self.state == SessionState::Open {
                    self.dispatch_frame(&raw);
                }
            }
            TransportEvent::Error(error) => {
                self.log.error(format!("Chat socket error: {error}"));
                notices.error("Chat connection error");
            }
            TransportEvent::Closed => match self.state {
                SessionState::Open | SessionState::Connecting => {
                    self.state = SessionState::Reconnecting;
                    self.reconnect.arm();
                    self.log.warn(format!(
                        "Chat disconnected, retrying in {}s",
                        self.settings.reconnect_delay.as_secs()
                    ));
                    notices.warn("Chat connection lost, reconnecting...");
                }
                SessionState::Reconnecting | SessionState::Disconnected => {}
            },
        }
    }

    fn dispatch_frame(&mut self, raw: &str) {
        match parse_frame(raw) {
            Ok(InboundFrame::ChatMessage(message)) => self.context.append(message),
            Ok(InboundFrame::UserList(users)) => self.context.roster = users,
            Ok(InboundFrame::Unknown(kind)) => {
                self.log.info(format!("Ignored chat frame type: {kind}"));
            }
            Err(err) => self.log.warn(format!("Dropped chat frame: {err}")),
        }
    }

    fn send_profile(&mut self) {
        let frame = OutboundFrame::UpdateProfile(&self.context.profile);
        let result = serde_json::to_string(&frame)
            .map_err(|err| ClientError::Protocol(err.to_string()))
            .and_then(|frame| self.transport.send(frame));
        if let Err(err) = result {
            self.log.warn(format!("Profile update not sent: {err}"));
        }
    }

    fn send_invite(&mut self, invite: &PartyInvite, notices: &mut Notices) -> ChatReply {
        if self.cooldown.is_active() {
            return ChatReply::Rejected(ClientError::Validation(format!(
                "Wait {}s before sending again",
                self.cooldown.remaining()
            )));
        }
        if self.state != SessionState::Open {
            let err = ClientError::Validation(
                "Cannot send: not connected to the chat server".to_string(),
            );
            notices.error(err.to_string());
            return ChatReply::Rejected(err);
        }
        if let Err(err) = invite.validate() {
            notices.error(err.to_string());
            return ChatReply::Rejected(err);
        }

        let content = invite.render(&self.settings.invite_template);
        let frame = OutboundFrame::ChatMessage(&content);
        let result = serde_json::to_string(&frame)
            .map_err(|err| ClientError::Protocol(err.to_string()))
            .and_then(|frame| self.transport.send(frame));
        match result {
            Ok(()) => {
                self.cooldown.start();
                ChatReply::Sent
            }
            Err(err) => {
                self.log.warn(format!("Invite not sent: {err}"));
                notices.error("Cannot send: not connected to the chat server");
                ChatReply::Rejected(err)
            }
        }
    }
}

pub fn generated_nickname() -> String {
    let mut bytes = [0u8; 2];
    let seed = match getrandom::getrandom(&mut bytes) {
        Ok(()) => u16::from_le_bytes(bytes) as u32,
        Err(_) => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.subsec_nanos())
            .unwrap_or_default(),
    };
    format!("Player{}", 1000 + seed % 9000)
}
