//! Per-connection chat session.
//!
//! A session reads lines from its client, adopts the first one as the
//! nickname and dispatches every following line against the shared
//! registries. Lines for the client are queued on its outbox and written to
//! the socket by a separate writer task, so a slow client never holds up
//! the session that is talking to it.

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::context::ServerContext;
use crate::chat::{
    command_list, format_room_users, format_rooms, format_users, outbox, parse_input,
    room_created, unknown_command, ChatCommand, ChatInput, ChatMessage, ClientHandle, Inbox,
    Outbox, NOT_IN_ROOM,
};
use crate::{RelayError, Result};

/// Session state representing the current phase of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Connected, waiting for the first line (the nickname).
    #[default]
    AwaitingNickname,
    /// Nickname registered; lines are commands or chat.
    Active,
    /// Read loop finished; registries cleaned up.
    Closed,
}

/// A chat session for one connected client.
pub struct ChatSession {
    /// Unique session identifier, used in logs.
    id: Uuid,
    /// Remote peer address, if known.
    peer_addr: Option<SocketAddr>,
    context: ServerContext,
    state: SessionState,
    nickname: Option<String>,
    connected_at: Option<DateTime<Utc>>,
    outbox: Outbox,
    inbox: Option<Inbox>,
}

impl ChatSession {
    /// Create a session that is waiting for its nickname.
    pub fn new(context: ServerContext, peer_addr: Option<SocketAddr>) -> Self {
        let (outbox, inbox) = outbox();
        let id = Uuid::new_v4();
        debug!("Created new session {} for {:?}", id, peer_addr);

        Self {
            id,
            peer_addr,
            context,
            state: SessionState::AwaitingNickname,
            nickname: None,
            connected_at: None,
            outbox,
            inbox: Some(inbox),
        }
    }

    /// Get the session ID.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Nickname, once the first line has been read.
    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// Run the session to completion.
    ///
    /// Returns when the client sends `/bye`, closes the stream, or a read or
    /// write fails. Registry cleanup happens in every case; the returned error is
    /// only the transport failure that ended the session, if any.
    pub async fn run<R, W>(mut self, mut reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (stopped_tx, mut writer_stopped) = oneshot::channel();
        let writer_task = self
            .inbox
            .take()
            .map(|inbox| tokio::spawn(write_lines(inbox, writer, self.id, stopped_tx)));

        let result = self.read_loop(&mut reader, &mut writer_stopped).await;
        self.close().await;

        // Dropping the last outbox lets the writer flush what is queued and stop.
        drop(self);
        if let Some(task) = writer_task {
            let _ = task.await;
        }

        result
    }

    /// Read and handle lines until the session closes.
    ///
    /// `writer_stopped` resolves once the writer task has exited, which
    /// while the session is alive only happens on a write error.
    async fn read_loop<R>(
        &mut self,
        reader: &mut R,
        writer_stopped: &mut oneshot::Receiver<()>,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        while self.state != SessionState::Closed {
            buf.clear();
            let read = tokio::select! {
                read = reader.read_until(b'\n', &mut buf) => read?,
                _ = &mut *writer_stopped => {
                    debug!(session = %self.id, "writer stopped, closing session");
                    break;
                }
            };
            if read == 0 {
                debug!(session = %self.id, "client closed the stream");
                break;
            }
            let line = decode_line(&buf);
            self.handle_line(line).await;
        }
        Ok(())
    }

    /// Process one input line according to the current state.
    pub async fn handle_line(&mut self, line: String) {
        match self.state {
            SessionState::AwaitingNickname => self.adopt_nickname(line).await,
            SessionState::Active => self.dispatch(parse_input(&line)).await,
            SessionState::Closed => {}
        }
    }

    async fn adopt_nickname(&mut self, nickname: String) {
        let handle = ClientHandle::new(self.outbox.clone(), self.id);
        self.connected_at = Some(handle.connected_at);
        self.context.presence().register(nickname.clone(), handle).await;
        info!(
            session = %self.id,
            peer = ?self.peer_addr,
            %nickname,
            "client connected"
        );

        self.nickname = Some(nickname);
        self.set_state(SessionState::Active);
        self.reply_lines(command_list());
    }

    async fn dispatch(&mut self, input: ChatInput) {
        let Some(nickname) = self.nickname.clone() else {
            return;
        };
        let context = self.context.clone();
        let rooms = context.rooms();

        let outcome = match input {
            ChatInput::Message(text) => {
                rooms.broadcast_from(&nickname, &text).await;
                Ok(())
            }
            ChatInput::Command(command) => {
                debug!(session = %self.id, %nickname, command = command.name(), "command");
                match command {
                    ChatCommand::ListRooms => {
                        self.reply_lines(format_rooms(&rooms.list_room_ids().await));
                        Ok(())
                    }
                    ChatCommand::CreateRoom => {
                        let id = rooms.create_room().await;
                        rooms.join(&nickname, id, &self.outbox).await.map(|id| {
                            self.reply(room_created(id));
                        })
                    }
                    ChatCommand::JoinRoom(id) => {
                        rooms.join(&nickname, id, &self.outbox).await.map(|_| ())
                    }
                    ChatCommand::ExitRoom => {
                        if rooms.leave(&nickname).await.is_none() {
                            self.reply(NOT_IN_ROOM);
                        }
                        Ok(())
                    }
                    ChatCommand::ListUsers => {
                        self.reply_lines(format_users(&context.presence().all_nicknames().await));
                        Ok(())
                    }
                    ChatCommand::ListRoomUsers => {
                        let members = match rooms.current_room(&nickname).await {
                            Some(id) => rooms.members_of(id).await,
                            None => None,
                        };
                        match members {
                            Some(members) => self.reply_lines(format_room_users(&members)),
                            None => self.reply(NOT_IN_ROOM),
                        }
                        Ok(())
                    }
                    ChatCommand::Whisper { target, text } => {
                        self.whisper(&nickname, &target, &text).await
                    }
                    ChatCommand::Disconnect => {
                        self.set_state(SessionState::Closed);
                        Ok(())
                    }
                    ChatCommand::Malformed(usage) => {
                        self.reply(usage.message());
                        Ok(())
                    }
                    ChatCommand::Unknown(verb) => {
                        self.reply(unknown_command(&verb));
                        Ok(())
                    }
                }
            }
        };

        match outcome {
            Err(e) if e.is_user_facing() => {
                debug!(session = %self.id, %nickname, error = %e, "command rejected");
                self.reply(e.to_string());
            }
            Err(e) => warn!(session = %self.id, %nickname, error = %e, "command failed"),
            Ok(()) => {}
        }
    }

    async fn whisper(&self, sender: &str, target: &str, text: &str) -> Result<()> {
        let line = ChatMessage::whisper(sender, text).format();
        if self.context.presence().send_to(target, line).await {
            Ok(())
        } else {
            Err(RelayError::UserOffline(target.to_string()))
        }
    }

    /// Unregister the nickname and leave its room.
    async fn close(&mut self) {
        self.set_state(SessionState::Closed);
        let Some(nickname) = self.nickname.take() else {
            debug!(session = %self.id, "closed before choosing a nickname");
            return;
        };

        self.context.presence().unregister(&nickname).await;
        self.context.rooms().leave(&nickname).await;

        let connected_secs = self
            .connected_at
            .map(|at| (Utc::now() - at).num_seconds())
            .unwrap_or_default();
        info!(
            session = %self.id,
            peer = ?self.peer_addr,
            %nickname,
            connected_secs,
            "client disconnected"
        );
    }

    fn set_state(&mut self, state: SessionState) {
        debug!(
            "Session {} state changed: {:?} -> {:?}",
            self.id, self.state, state
        );
        self.state = state;
    }

    fn reply(&self, line: impl Into<String>) {
        let _ = self.outbox.send(line.into());
    }

    fn reply_lines(&self, lines: Vec<String>) {
        for line in lines {
            self.reply(line);
        }
    }
}

/// Run a session over an accepted TCP connection.
pub async fn handle_connection(context: ServerContext, stream: TcpStream, peer: SocketAddr) {
    let (reader, writer) = stream.into_split();
    let session = ChatSession::new(context, Some(peer));
    let id = session.id();
    if let Err(e) = session.run(BufReader::new(reader), writer).await {
        debug!(session = %id, peer = %peer, error = %e, "session ended with transport error");
    }
}

/// Strip the line terminator and decode, replacing invalid UTF-8.
fn decode_line(buf: &[u8]) -> String {
    let mut end = buf.len();
    if end > 0 && buf[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && buf[end - 1] == b'\r' {
            end -= 1;
        }
    }
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Drain `inbox` into `writer`, one newline-terminated line at a time.
///
/// Stops at the first write error; lines queued afterwards are dropped.
/// `stopped` is signalled on a write error and dropped on any exit, so the
/// session's read loop notices a dead writer.
async fn write_lines<W>(
    mut inbox: Inbox,
    mut writer: W,
    session_id: Uuid,
    stopped: oneshot::Sender<()>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = inbox.recv().await {
        if let Err(e) = write_line(&mut writer, &line).await {
            debug!(session = %session_id, error = %e, "failed to write to client");
            let _ = stopped.send(());
            return;
        }
    }
    let _ = writer.shutdown().await;
}

async fn write_line<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
