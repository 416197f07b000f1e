//! End-to-end tests: the bot binary against a scripted server.

mod common;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use common::{ServerConn, TestBot, TestServer, fixture_key};
use md5::{Digest, Md5};
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use std::path::Path;

/// Encrypt `secret` to the fixture key the way an ircd does for CHALLENGE.
fn encrypt_challenge(secret: &[u8]) -> String {
    let pem = std::fs::read_to_string(fixture_key()).expect("read fixture key");
    let key = RsaPrivateKey::from_pkcs8_encrypted_pem(&pem, "hunter2").expect("decrypt fixture");
    let ciphertext = RsaPublicKey::from(&key)
        .encrypt(&mut rand::thread_rng(), Oaep::new::<sha1::Sha1>(), secret)
        .expect("encrypt challenge");
    BASE64.encode(ciphertext)
}

async fn grantme(conn: &mut ServerConn, text: &str) -> anyhow::Result<()> {
    conn.send_raw(&format!(":alice!alice@host.test PRIVMSG grantbot :{text}"))
        .await
}

#[tokio::test]
async fn test_full_grant_flow() {
    let server = TestServer::bind().await.expect("bind");
    let _bot = TestBot::spawn(&server.address().unwrap(), &fixture_key()).expect("spawn bot");
    let mut conn = server.accept().await.expect("bot never connected");

    // Registration with SASL PLAIN.
    conn.expect("PASS connpass").await.unwrap();
    conn.expect("CAP LS 302").await.unwrap();
    conn.expect("NICK grantbot").await.unwrap();
    conn.expect("USER grantbot 0 * grantbot").await.unwrap();
    conn.send_raw(":irc.test CAP * LS :multi-prefix sasl").await.unwrap();
    conn.expect("CAP REQ sasl").await.unwrap();
    conn.send_raw(":irc.test CAP * ACK :sasl").await.unwrap();
    conn.expect("AUTHENTICATE PLAIN").await.unwrap();
    conn.send_raw("AUTHENTICATE +").await.unwrap();
    let payload = grantbot_proto::sasl::encode_plain("grantbot", "saslpass");
    conn.expect(&format!("AUTHENTICATE {payload}")).await.unwrap();
    conn.send_raw(":irc.test 900 grantbot grantbot!grantbot@host grantbot :You are now logged in as grantbot")
        .await
        .unwrap();
    conn.send_raw(":irc.test 903 grantbot :SASL authentication successful")
        .await
        .unwrap();
    conn.expect("CAP END").await.unwrap();

    // Welcome triggers CHALLENGE.
    conn.send_raw(":irc.test 001 grantbot :Welcome to the test network")
        .await
        .unwrap();
    conn.send_raw(":irc.test 005 grantbot CASEMAPPING=rfc1459 :are supported by this server")
        .await
        .unwrap();
    conn.expect("CHALLENGE grantbot").await.unwrap();

    let secret = b"0123456789abcdef0123456789abcdef";
    let encoded = encrypt_challenge(secret);
    for chunk in encoded.as_bytes().chunks(120) {
        let chunk = std::str::from_utf8(chunk).unwrap();
        conn.send_raw(&format!(":irc.test 740 grantbot :{chunk}"))
            .await
            .unwrap();
    }
    conn.send_raw(":irc.test 741 grantbot :End of CHALLENGE").await.unwrap();
    let response = BASE64.encode(Md5::digest(secret));
    conn.expect(&format!("CHALLENGE +{response}")).await.unwrap();
    conn.send_raw(":irc.test 381 grantbot :You are now an IRC operator")
        .await
        .unwrap();

    // PING is answered while idle.
    conn.send_raw("PING :irc.test").await.unwrap();
    conn.expect("PONG irc.test").await.unwrap();

    // Allowed privset.
    grantme(&mut conn, "grantme oper").await.unwrap();
    conn.answer_whois("alice", Some("alice")).await.unwrap();
    conn.expect("GRANT alice oper").await.unwrap();
    conn.expect("NOTICE alice :good luck with oper mate").await.unwrap();

    // Unknown privset: a notice and no GRANT.
    grantme(&mut conn, "grantme root").await.unwrap();
    conn.answer_whois("alice", Some("alice")).await.unwrap();
    conn.expect("NOTICE alice :dunno what 'root' means").await.unwrap();
    conn.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_denials() {
    let server = TestServer::bind().await.expect("bind");
    let _bot = TestBot::spawn(
        &server.address().unwrap(),
        Path::new("/nonexistent/grantbot/oper.key"),
    )
    .expect("spawn bot");
    let mut conn = server.accept().await.expect("bot never connected");

    conn.register_plain("grantbot").await.unwrap();
    // No usable key: no CHALLENGE.
    conn.expect_silence().await.unwrap();

    grantme(&mut conn, "grantme oper").await.unwrap();
    conn.answer_whois("alice", None).await.unwrap();
    conn.expect("NOTICE alice :who are you though").await.unwrap();

    grantme(&mut conn, "grantme").await.unwrap();
    conn.answer_whois("alice", Some("alice")).await.unwrap();
    conn.expect("NOTICE alice :give me an argument then").await.unwrap();

    // Not a command: ignored without a WHOIS.
    grantme(&mut conn, "hello").await.unwrap();
    conn.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_nick_collision_tracks_new_nick() {
    let server = TestServer::bind().await.expect("bind");
    let _bot = TestBot::spawn(
        &server.address().unwrap(),
        Path::new("/nonexistent/grantbot/oper.key"),
    )
    .expect("spawn bot");
    let mut conn = server.accept().await.expect("bot never connected");

    conn.expect("PASS connpass").await.unwrap();
    conn.expect("CAP LS 302").await.unwrap();
    conn.expect("NICK grantbot").await.unwrap();
    conn.expect("USER grantbot 0 * grantbot").await.unwrap();
    conn.send_raw(":irc.test 433 * grantbot :Nickname is already in use")
        .await
        .unwrap();
    conn.expect("NICK grantbot_").await.unwrap();
    conn.send_raw(":irc.test CAP * LS :multi-prefix").await.unwrap();
    conn.expect("CAP END").await.unwrap();
    conn.send_raw(":irc.test 001 grantbot_ :Welcome").await.unwrap();

    // Messages to the old nick are not for us.
    grantme(&mut conn, "grantme oper").await.unwrap();
    conn.expect_silence().await.unwrap();

    conn.send_raw(":alice!alice@host.test PRIVMSG grantbot_ :grantme helper")
        .await
        .unwrap();
    conn.expect("WHOIS alice").await.unwrap();
    conn.send_raw(":irc.test 320 grantbot_ alice :is opered as alice, privset admin")
        .await
        .unwrap();
    conn.send_raw(":irc.test 318 grantbot_ alice :End of /WHOIS list.")
        .await
        .unwrap();
    conn.expect("GRANT alice helper").await.unwrap();
    conn.expect("NOTICE alice :good luck with helper mate").await.unwrap();
}

#[tokio::test]
async fn test_reconnects_after_error() {
    let server = TestServer::bind().await.expect("bind");
    let _bot = TestBot::spawn(
        &server.address().unwrap(),
        Path::new("/nonexistent/grantbot/oper.key"),
    )
    .expect("spawn bot");

    let mut conn = server.accept().await.expect("bot never connected");
    conn.expect("PASS connpass").await.unwrap();
    conn.send_raw("ERROR :Closing Link: banned").await.unwrap();
    drop(conn);

    // The bot comes back after its reconnect delay.
    let mut conn = tokio::time::timeout(std::time::Duration::from_secs(20), server.accept())
        .await
        .expect("no reconnect within 20s")
        .expect("accept");
    conn.expect("PASS connpass").await.unwrap();
}
