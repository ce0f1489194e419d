use crate::{
    chat::{Transport, TransportEvent, TransportMessage},
    error::{ClientError, ClientResult},
};
use std::{
    io::ErrorKind,
    net::TcpStream,
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread,
    time::Duration,
};
use tungstenite::{stream::MaybeTlsStream, Message, WebSocket};

const READ_POLL: Duration = Duration::from_millis(100);

enum SocketCommand {
    Send(String),
    Close,
}

/// WebSocket transport. Each connection attempt runs on its own worker thread
/// and reports back through the shared event channel.
pub struct WsTransport {
    events: Sender<TransportMessage>,
    commands: Option<Sender<SocketCommand>>,
}

impl WsTransport {
    pub fn new(events: Sender<TransportMessage>) -> Self {
        Self {
            events,
            commands: None,
        }
    }
}

impl Transport for WsTransport {
    fn connect(&mut self, url: &str, generation: u64) {
        self.close();
        let (tx, rx) = mpsc::channel();
        self.commands = Some(tx);
        let url = url.to_string();
        let events = self.events.clone();
        thread::spawn(move || run_socket(&url, generation, &events, &rx));
    }

    fn send(&mut self, frame: String) -> ClientResult<()> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| ClientError::Transient("chat socket is not connected".to_string()))?;
        commands
            .send(SocketCommand::Send(frame))
            .map_err(|_| ClientError::Transient("chat socket is closed".to_string()))
    }

    fn close(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(SocketCommand::Close);
        }
    }
}

fn emit(events: &Sender<TransportMessage>, generation: u64, event: TransportEvent) {
    let _ = events.send(TransportMessage { generation, event });
}

fn fail(events: &Sender<TransportMessage>, generation: u64, error: String) {
    emit(events, generation, TransportEvent::Error(error));
    emit(events, generation, TransportEvent::Closed);
}

fn run_socket(
    url: &str,
    generation: u64,
    events: &Sender<TransportMessage>,
    commands: &Receiver<SocketCommand>,
) {
    let mut socket = match tungstenite::connect(url) {
        Ok((socket, _)) => socket,
        Err(err) => {
            fail(events, generation, err.to_string());
            return;
        }
    };
    if let MaybeTlsStream::Plain(stream) = socket.get_mut() {
        let _ = stream.set_read_timeout(Some(READ_POLL));
    }
    emit(events, generation, TransportEvent::Opened);

    loop {
        if !drain_commands(&mut socket, commands, events, generation) {
            return;
        }
        match socket.read() {
            Ok(Message::Text(text)) => emit(events, generation, TransportEvent::Frame(text)),
            Ok(Message::Close(_)) => {
                emit(events, generation, TransportEvent::Closed);
                return;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                emit(events, generation, TransportEvent::Closed);
                return;
            }
            Err(err) => {
                fail(events, generation, err.to_string());
                return;
            }
        }
    }
}

/// Flushes queued outbound frames. Returns false once the worker should stop.
fn drain_commands(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    commands: &Receiver<SocketCommand>,
    events: &Sender<TransportMessage>,
    generation: u64,
) -> bool {
    loop {
        match commands.try_recv() {
            Ok(SocketCommand::Send(text)) => {
                if let Err(err) = socket.send(Message::Text(text)) {
                    fail(events, generation, err.to_string());
                    return false;
                }
            }
            Ok(SocketCommand::Close) | Err(TryRecvError::Disconnected) => {
                let _ = socket.close(None);
                let _ = socket.flush();
                return false;
            }
            Err(TryRecvError::Empty) => return true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn send_before_connect_is_transient() {
        let (tx, _rx) = mpsc::channel();
        let mut transport = WsTransport::new(tx);
        assert!(matches!(
            transport.send("{}".to_string()),
            Err(ClientError::Transient(_))
        ));
    }

    #[test]
    fn refused_connection_reports_error_then_close() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let (tx, rx) = mpsc::channel();
        let mut transport = WsTransport::new(tx);
        transport.connect(&format!("ws://127.0.0.1:{port}/ws/chat"), 7);

        let first = rx.recv_timeout(Duration::from_secs(5)).expect("first event");
        let second = rx.recv_timeout(Duration::from_secs(5)).expect("second event");
        assert_eq!(first.generation, 7);
        assert!(matches!(first.event, TransportEvent::Error(_)));
        assert_eq!(second.event, TransportEvent::Closed);
    }
}
