/*
 * imap_session.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration tests for the IMAP client. Each test drives ImapClient over an
 * in-memory duplex stream against a scripted server.
 *
 * Run with:
 *   cargo test -p corriere_core --test imap_session
 */

use std::time::Duration;

use tokio::io::{
    duplex, split, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf,
};

use corriere_core::protocol::imap::{CreateCommand, ImapClient};
use corriere_core::{ClientConfig, CommandError};

struct Server {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
}

impl Server {
    async fn expect(&mut self, line: &str) {
        let mut got = String::new();
        self.reader.read_line(&mut got).await.unwrap();
        assert_eq!(got, format!("{}\r\n", line));
    }

    async fn send(&mut self, text: &str) {
        self.writer.write_all(text.as_bytes()).await.unwrap();
    }
}

async fn connect() -> (ImapClient<DuplexStream>, Server) {
    let (client_io, server_io) = duplex(16 * 1024);
    let (r, w) = split(server_io);
    let mut server = Server {
        reader: BufReader::new(r),
        writer: w,
    };
    server.send("* OK [CAPABILITY IMAP4rev2] ready\r\n").await;
    let client = ImapClient::from_stream(client_io, "localhost", &ClientConfig::default())
        .await
        .unwrap();
    (client, server)
}

#[tokio::test]
async fn select_accumulates_mailbox_status() {
    let (client, mut server) = connect().await;
    let script = async {
        server.expect("A0001 SELECT \"INBOX\"").await;
        server
            .send(concat!(
                "* 172 EXISTS\r\n",
                "* 1 RECENT\r\n",
                "* OK [UNSEEN 12] Message 12 is first unseen\r\n",
                "* OK [UIDVALIDITY 3857529045] UIDs valid\r\n",
                "* OK [UIDNEXT 4392] Predicted next UID\r\n",
                "* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n",
                "* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n",
                "A0001 OK [READ-WRITE] SELECT completed\r\n",
            ))
            .await;
    };
    let (status, ()) = tokio::join!(client.select("INBOX"), script);
    let status = status.unwrap();
    assert_eq!(status.exists, 172);
    assert_eq!(status.recent, 1);
    assert_eq!(status.first_unseen, Some(12));
    assert_eq!(status.uid_validity, Some(3857529045));
    assert_eq!(status.uid_next, Some(4392));
    assert_eq!(status.flags.len(), 5);
    assert_eq!(status.permanent_flags, vec!["\\Deleted", "\\Seen", "\\*"]);
    assert!(!status.read_only);
}

#[tokio::test]
async fn tagged_no_is_a_protocol_failure() {
    let (client, mut server) = connect().await;
    let script = async {
        server.expect("A0001 SELECT \"Nope\"").await;
        server.send("A0001 NO [NONEXISTENT] Unknown mailbox\r\n").await;
    };
    let (result, ()) = tokio::join!(client.select("Nope"), script);
    assert_eq!(
        result,
        Err(CommandError::ProtocolFailure {
            code: None,
            message: "NO [NONEXISTENT] Unknown mailbox".to_string(),
        })
    );
}

#[tokio::test]
async fn invalid_command_writes_nothing_and_uses_no_tag() {
    let (client, mut server) = connect().await;
    let result = client.execute(CreateCommand::new("")).await;
    assert!(matches!(result, Err(CommandError::InvalidArgument(_))));

    // The next command is the first thing on the wire and still gets A0001.
    let script = async {
        server.expect("A0001 NOOP").await;
        server.send("A0001 OK NOOP completed\r\n").await;
    };
    let (result, ()) = tokio::join!(client.noop(), script);
    assert_eq!(result, Ok(()));
}

#[tokio::test(start_paused = true)]
async fn timeout_then_late_reply_is_inert() {
    let (client, mut server) = connect().await;
    let (result, ()) = tokio::join!(client.select("INBOX"), server.expect("A0001 SELECT \"INBOX\""));
    assert_eq!(result, Err(CommandError::Timeout(Duration::from_secs(30))));

    server.send("* 3 EXISTS\r\nA0001 OK [READ-WRITE] SELECT completed\r\n").await;
    let script = async {
        server.expect("A0002 NOOP").await;
        server.send("A0002 OK NOOP completed\r\n").await;
    };
    let (result, ()) = tokio::join!(client.noop(), script);
    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn concurrent_callers_are_serialized_in_order() {
    let (client, mut server) = connect().await;
    let script = async {
        server.expect("A0001 NOOP").await;
        server.send("A0001 OK done\r\n").await;
        server.expect("A0002 CAPABILITY").await;
        server
            .send("* CAPABILITY IMAP4rev2 IDLE UNSELECT\r\nA0002 OK done\r\n")
            .await;
        server.expect("A0003 LIST \"\" \"*\"").await;
        server
            .send(concat!(
                "* LIST (\\HasNoChildren) \"/\" INBOX\r\n",
                "* LIST (\\HasChildren \\Noselect) \"/\" Archive\r\n",
                "A0003 OK done\r\n",
            ))
            .await;
    };
    let (noop, caps, list, ()) =
        tokio::join!(client.noop(), client.capability(), client.list("", "*"), script);
    assert_eq!(noop, Ok(()));
    assert_eq!(caps.unwrap(), vec!["IMAP4REV2", "IDLE", "UNSELECT"]);
    let list = list.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[1].name, "Archive");
    assert_eq!(list[1].delimiter, Some('/'));
}

#[tokio::test]
async fn dropped_connection_fails_in_flight_and_later_commands() {
    let (client, mut server) = connect().await;
    let script = async move {
        server.expect("A0001 SELECT \"INBOX\"").await;
        drop(server);
    };
    let (result, ()) = tokio::join!(client.select("INBOX"), script);
    assert!(matches!(result, Err(CommandError::TransportFailure(_))));
    assert!(matches!(client.noop().await, Err(CommandError::TransportFailure(_))));
}

#[tokio::test]
async fn bye_greeting_refuses_the_session() {
    let (client_io, mut server_io) = duplex(1024);
    server_io.write_all(b"* BYE server shutting down\r\n").await.unwrap();
    let result = ImapClient::from_stream(client_io, "localhost", &ClientConfig::default()).await;
    assert!(matches!(result, Err(CommandError::ProtocolFailure { .. })));
}

#[tokio::test]
async fn logout_accepts_bye_then_closes() {
    let (client, mut server) = connect().await;
    let script = async {
        server.expect("A0001 LOGOUT").await;
        server.send("* BYE logging out\r\nA0001 OK LOGOUT completed\r\n").await;
    };
    let (result, ()) = tokio::join!(client.logout(), script);
    assert_eq!(result, Ok(()));
    assert!(matches!(client.noop().await, Err(CommandError::TransportFailure(_))));
}
