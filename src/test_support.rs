use crate::common::time::Clock;
use crate::notify::{NotifyError, NotifyMessage, Notifier};
use chrono::{DateTime, Local, NaiveDate};
use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Single-purpose HTTP/1.1 server answering `hits` requests with a fixed status.
pub(crate) struct Responder {
    pub url: String,
    requests: Receiver<CapturedRequest>,
}

impl Responder {
    pub fn next_request(&self) -> CapturedRequest {
        self.requests
            .recv_timeout(Duration::from_secs(5))
            .expect("responder should have captured a request")
    }
}

pub(crate) fn spawn_responder(status: u16, hits: usize) -> Responder {
    spawn_responder_with_body(status, hits, 0)
}

pub(crate) fn spawn_responder_with_body(status: u16, hits: usize, body_len: usize) -> Responder {
    spawn(status, hits, body_len, None)
}

/// Answers every request with `status` and `Location: <location>`.
pub(crate) fn spawn_redirect(status: u16, hits: usize, location: &str) -> Responder {
    spawn(status, hits, 0, Some(location.to_string()))
}

/// Redirects back to itself, `hits` times.
pub(crate) fn spawn_redirect_loop(hits: usize) -> Responder {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind responder");
    let url = format!("http://{}/health", listener.local_addr().expect("responder addr"));
    serve(listener, 302, hits, 0, Some(url))
}

fn spawn(status: u16, hits: usize, body_len: usize, location: Option<String>) -> Responder {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind responder");
    serve(listener, status, hits, body_len, location)
}

fn serve(
    listener: TcpListener,
    status: u16,
    hits: usize,
    body_len: usize,
    location: Option<String>,
) -> Responder {
    let addr = listener.local_addr().expect("responder addr");
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for _ in 0..hits {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let Ok(request) = read_request(&mut stream) else {
                continue;
            };
            let body = vec![b'x'; if request.method == "HEAD" { 0 } else { body_len }];
            let location_line = location
                .as_deref()
                .map(|target| format!("Location: {target}\r\n"))
                .unwrap_or_default();
            let head = format!(
                "HTTP/1.1 {status} {}\r\n{location_line}Content-Length: {}\r\nConnection: close\r\n\r\n",
                reason(status),
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
            let _ = stream.flush();
            let _ = tx.send(request);
        }
    });

    Responder {
        url: format!("http://{addr}/health"),
        requests: rx,
    }
}

/// Completes the TCP handshake (via the backlog) but never answers.
pub(crate) struct SilentListener {
    pub url: String,
    _listener: TcpListener,
}

pub(crate) fn silent_listener() -> SilentListener {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    SilentListener {
        url: format!("http://{addr}/health"),
        _listener: listener,
    }
}

/// An address nothing listens on, for connection-refused probes.
pub(crate) fn closed_port_url() -> String {
    format!("http://127.0.0.1:{}/health", closed_port())
}

/// The listener is dropped on return, leaving the port unbound.
pub(crate) fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        307 => "Temporary Redirect",
        201 => "Created",
        204 => "No Content",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

fn read_request(stream: &mut TcpStream) -> io::Result<CapturedRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..read]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..read]);
    }

    Ok(CapturedRequest {
        method,
        path,
        headers,
        body,
    })
}

pub(crate) struct FixedClock(pub DateTime<Local>);

impl FixedClock {
    pub fn at_sample_time() -> Self {
        Self(sample_time())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

pub(crate) fn sample_time() -> DateTime<Local> {
    NaiveDate::from_ymd_opt(2024, 9, 28)
        .and_then(|date| date.and_hms_micro_opt(22, 35, 22, 5085))
        .and_then(|naive| naive.and_local_timezone(Local).single())
        .expect("valid local time")
}

#[derive(Clone, Default)]
pub(crate) struct RecordingNotifier {
    sent: Rc<RefCell<Vec<NotifyMessage>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<NotifyMessage> {
        self.sent.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, message: &NotifyMessage) -> Result<(), NotifyError> {
        self.sent.borrow_mut().push(message.clone());
        Ok(())
    }
}
