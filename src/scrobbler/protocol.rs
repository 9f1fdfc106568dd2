// Audioscrobbler 1.2.1 wire format
// Builds request parameters and classifies response bodies

use super::token::token;
use super::traits::{Method, Request, RequestKind, TrackSubmission};
use thiserror::Error;

/// Fixed submission source: chosen by the user
const SOURCE_USER: &str = "P";

/// Static parameters identifying this client to the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub handshake_url: String,
    pub protocol_version: String,
    pub client_id: String,
    pub client_version: String,
}

/// Endpoints and session id returned by a successful handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub now_playing_url: String,
    pub submission_url: String,
}

/// Why a handshake did not yield a session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("client has been banned")]
    Banned,

    #[error("invalid username or password")]
    BadAuth,

    #[error("system clock is too far off")]
    BadTime,

    #[error("handshake failed: {0}")]
    Failed(String),

    #[error("unexpected handshake response: {0:?}")]
    Malformed(String),

    #[error("handshake request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResponse {
    Ok,
    BadSession,
    Failed(String),
}

fn pair(key: impl Into<String>, value: impl Into<String>) -> (String, String) {
    (key.into(), value.into())
}

/// Build the handshake GET request
pub fn handshake_request(
    client: &ClientInfo,
    username: &str,
    password: &str,
    timestamp: i64,
) -> Request {
    let timestamp = timestamp.to_string();
    let auth = token(password, &timestamp);

    Request {
        kind: RequestKind::Handshake,
        method: Method::Get,
        url: client.handshake_url.clone(),
        params: vec![
            pair("hs", "true"),
            pair("p", client.protocol_version.as_str()),
            pair("c", client.client_id.as_str()),
            pair("v", client.client_version.as_str()),
            pair("u", username),
            pair("t", timestamp),
            pair("a", auth),
        ],
    }
}

/// Parse a newline-delimited handshake body
pub fn parse_handshake(body: &str) -> Result<Session, HandshakeError> {
    let mut lines = body.lines().map(str::trim);
    let status = lines.next().unwrap_or_default();

    match status {
        "OK" => {
            let mut field = || {
                lines
                    .next()
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| HandshakeError::Malformed(body.to_string()))
            };
            Ok(Session {
                id: field()?,
                now_playing_url: field()?,
                submission_url: field()?,
            })
        }
        "BANNED" => Err(HandshakeError::Banned),
        "BADAUTH" => Err(HandshakeError::BadAuth),
        "BADTIME" => Err(HandshakeError::BadTime),
        other => match other.strip_prefix("FAILED") {
            Some(reason) => Err(HandshakeError::Failed(reason.trim().to_string())),
            None => Err(HandshakeError::Malformed(other.to_string())),
        },
    }
}

/// Build the now-playing POST for a single track
pub fn now_playing_request(session: &Session, track: &TrackSubmission) -> Request {
    Request {
        kind: RequestKind::NowPlaying,
        method: Method::Post,
        url: session.now_playing_url.clone(),
        params: vec![
            pair("s", session.id.as_str()),
            pair("a", track.artist()),
            pair("t", track.title()),
            pair("b", track.album()),
            pair("l", track.duration().to_string()),
            pair("n", ""),
        ],
    }
}

/// Build one batched submission POST covering `tracks` in order
pub fn submission_request(session: &Session, tracks: &[TrackSubmission]) -> Request {
    let mut params = Vec::with_capacity(1 + tracks.len() * 9);
    params.push(pair("s", session.id.as_str()));

    for (i, track) in tracks.iter().enumerate() {
        params.push(pair(format!("a[{i}]"), track.artist()));
        params.push(pair(format!("t[{i}]"), track.title()));
        params.push(pair(format!("b[{i}]"), track.album()));
        params.push(pair(format!("i[{i}]"), track.started_at().to_string()));
        params.push(pair(format!("l[{i}]"), track.duration().to_string()));
        // track number, MusicBrainz id and rating are not populated
        params.push(pair(format!("n[{i}]"), ""));
        params.push(pair(format!("m[{i}]"), ""));
        params.push(pair(format!("r[{i}]"), ""));
        params.push(pair(format!("o[{i}]"), SOURCE_USER));
    }

    Request {
        kind: RequestKind::Submission,
        method: Method::Post,
        url: session.submission_url.clone(),
        params,
    }
}

/// Classify a submission body, ignoring line breaks
pub fn parse_submission(body: &str) -> SubmissionResponse {
    let status: String = body.chars().filter(|c| *c != '\n' && *c != '\r').collect();

    match status.as_str() {
        "OK" => SubmissionResponse::Ok,
        "BADSESSION" => SubmissionResponse::BadSession,
        _ => SubmissionResponse::Failed(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrobbler::traits::TrackMetadata;
    use std::time::Duration;

    fn client() -> ClientInfo {
        ClientInfo {
            handshake_url: "http://post.example/".to_string(),
            protocol_version: "1.2.1".to_string(),
            client_id: "adl".to_string(),
            client_version: "0.1".to_string(),
        }
    }

    fn session() -> Session {
        Session {
            id: "SID123".to_string(),
            now_playing_url: "http://np".to_string(),
            submission_url: "http://sub".to_string(),
        }
    }

    fn track(artist: &str, title: &str, album: Option<&str>, started_at: i64) -> TrackSubmission {
        let metadata = TrackMetadata {
            artist: artist.to_string(),
            title: title.to_string(),
            album: album.map(str::to_string),
        };
        TrackSubmission::new(&metadata, Duration::from_secs(300), started_at).unwrap()
    }

    #[test]
    fn test_handshake_request_parameters() {
        let request = handshake_request(&client(), "alice", "secret", 1_200_000_000);

        assert_eq!(request.method, Method::Get);
        assert_eq!(request.url, "http://post.example/");
        let keys: Vec<&str> = request.params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["hs", "p", "c", "v", "u", "t", "a"]);
        assert_eq!(request.param("hs"), Some("true"));
        assert_eq!(request.param("u"), Some("alice"));
        assert_eq!(request.param("t"), Some("1200000000"));
        assert_eq!(request.param("a"), Some(token("secret", "1200000000").as_str()));
    }

    #[test]
    fn test_parse_handshake_ok() {
        let parsed = parse_handshake("OK\nSID123\nhttp://np\nhttp://sub\n").unwrap();
        assert_eq!(parsed, session());
    }

    #[test]
    fn test_parse_handshake_rejections() {
        assert_eq!(parse_handshake("BANNED\n"), Err(HandshakeError::Banned));
        assert_eq!(parse_handshake("BADAUTH"), Err(HandshakeError::BadAuth));
        assert_eq!(parse_handshake("BADTIME\n"), Err(HandshakeError::BadTime));
        assert_eq!(
            parse_handshake("FAILED Plugin bug\n"),
            Err(HandshakeError::Failed("Plugin bug".to_string()))
        );
        assert!(matches!(
            parse_handshake("<html>oops</html>"),
            Err(HandshakeError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_handshake_ok_missing_lines() {
        assert!(matches!(
            parse_handshake("OK\nSID123\n"),
            Err(HandshakeError::Malformed(_))
        ));
    }

    #[test]
    fn test_now_playing_fields() {
        let request = now_playing_request(&session(), &track("A", "B", None, 10));

        assert_eq!(request.url, "http://np");
        assert_eq!(
            request.params,
            vec![
                pair("s", "SID123"),
                pair("a", "A"),
                pair("t", "B"),
                pair("b", ""),
                pair("l", "300"),
                pair("n", ""),
            ]
        );
    }

    #[test]
    fn test_submission_batches_in_order() {
        let tracks = [track("A1", "T1", Some("B1"), 100), track("A2", "T2", None, 400)];
        let request = submission_request(&session(), &tracks);

        assert_eq!(request.url, "http://sub");
        assert_eq!(request.params.len(), 1 + 2 * 9);
        assert_eq!(request.param("s"), Some("SID123"));
        assert_eq!(request.param("a[0]"), Some("A1"));
        assert_eq!(request.param("b[0]"), Some("B1"));
        assert_eq!(request.param("i[0]"), Some("100"));
        assert_eq!(request.param("a[1]"), Some("A2"));
        assert_eq!(request.param("b[1]"), Some(""));
        assert_eq!(request.param("i[1]"), Some("400"));
        assert_eq!(request.param("l[1]"), Some("300"));
        assert_eq!(request.param("n[1]"), Some(""));
        assert_eq!(request.param("m[1]"), Some(""));
        assert_eq!(request.param("r[1]"), Some(""));
        assert_eq!(request.param("o[1]"), Some("P"));

        let first_track_1 = request.params.iter().position(|(k, _)| k == "a[1]");
        let last_track_0 = request.params.iter().position(|(k, _)| k == "o[0]");
        assert!(last_track_0 < first_track_1);
    }

    #[test]
    fn test_parse_submission() {
        assert_eq!(parse_submission("OK\n"), SubmissionResponse::Ok);
        assert_eq!(parse_submission("BADSESSION\n"), SubmissionResponse::BadSession);
        assert_eq!(
            parse_submission("FAILED Service down\n"),
            SubmissionResponse::Failed("FAILED Service down".to_string())
        );
    }
}
