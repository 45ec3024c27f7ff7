//! End-to-end tests of the request pipeline: raw frame in, encoded reply out.

use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;
use tinycache::{encode_command, CommandHandler, StorageEngine};

fn handler() -> CommandHandler {
    CommandHandler::new(Arc::new(StorageEngine::new()))
}

fn send(handler: &CommandHandler, args: &[&str]) -> String {
    let reply = handler.handle(&encode_command(args.iter().copied()));
    String::from_utf8(reply.to_vec()).unwrap()
}

#[test]
fn get_missing_then_existing() {
    let h = handler();

    assert!(send(&h, &["GET", "non_existing_key"]).starts_with("-KeyNotFound"));

    assert_eq!(send(&h, &["SET", "number", "10"]), "+OK\r\n");
    assert_eq!(send(&h, &["GET", "number"]), "$2\r\n10\r\n");

    assert_eq!(send(&h, &["SET", "mykey", "hello"]), "+OK\r\n");
    assert_eq!(send(&h, &["GET", "mykey"]), "$5\r\nhello\r\n");
}

#[test]
fn set_then_get_returns_exact_text() {
    let h = handler();

    for (value, reply) in [
        ("007", "$3\r\n007\r\n"),
        ("+5", "$2\r\n+5\r\n"),
        ("-0", "$2\r\n-0\r\n"),
        ("-12", "$3\r\n-12\r\n"),
    ] {
        assert_eq!(send(&h, &["SET", "k", value]), "+OK\r\n");
        assert_eq!(send(&h, &["GET", "k"]), reply, "value {}", value);
    }

    // Only the canonical form is a counter
    send(&h, &["SET", "padded", "007"]);
    assert!(send(&h, &["INCR", "padded"]).starts_with("-TypeError"));
    send(&h, &["SET", "plain", "7"]);
    assert_eq!(send(&h, &["INCR", "plain"]), ":8\r\n");
}

#[test]
fn set_overwrites() {
    let h = handler();

    send(&h, &["SET", "mykey", "first"]);
    assert_eq!(send(&h, &["SET", "mykey", "value"]), "+OK\r\n");
    assert_eq!(send(&h, &["GET", "mykey"]), "$5\r\nvalue\r\n");
}

#[test]
fn exists_and_del() {
    let h = handler();

    assert_eq!(send(&h, &["EXISTS", "no_key"]), ":0\r\n");
    assert_eq!(send(&h, &["DEL", "no_key"]), ":0\r\n");

    send(&h, &["SET", "mykey", "value"]);
    assert_eq!(send(&h, &["EXISTS", "mykey"]), ":1\r\n");
    assert_eq!(send(&h, &["DEL", "mykey"]), ":1\r\n");
    assert_eq!(send(&h, &["EXISTS", "mykey"]), ":0\r\n");
}

#[test]
fn incr_and_decr() {
    let h = handler();

    assert_eq!(send(&h, &["INCR", "newkey"]), ":1\r\n");
    assert_eq!(send(&h, &["INCR", "newkey"]), ":2\r\n");
    assert_eq!(send(&h, &["DECR", "newkey"]), ":1\r\n");
    assert_eq!(send(&h, &["DECR", "other"]), ":-1\r\n");

    send(&h, &["SET", "mykey", "hello"]);
    assert!(send(&h, &["INCR", "mykey"]).starts_with("-TypeError"));
    assert_eq!(send(&h, &["GET", "mykey"]), "$5\r\nhello\r\n");
}

#[test]
fn lpush_and_lrange() {
    let h = handler();

    assert!(send(&h, &["LRANGE", "mylist", "0", "-1"]).starts_with("-KeyNotFound"));

    assert_eq!(send(&h, &["LPUSH", "mylist", "a", "b", "c"]), ":3\r\n");
    assert_eq!(
        send(&h, &["LRANGE", "mylist", "0", "-1"]),
        "*3\r\n$1\r\nc\r\n$1\r\nb\r\n$1\r\na\r\n"
    );
    assert_eq!(
        send(&h, &["LRANGE", "mylist", "1", "100"]),
        "*2\r\n$1\r\nb\r\n$1\r\na\r\n"
    );
    assert_eq!(
        send(&h, &["LRANGE", "mylist", "-100", "0"]),
        "*1\r\n$1\r\nc\r\n"
    );
}

#[test]
fn rpush_and_pops() {
    let h = handler();

    assert_eq!(send(&h, &["RPUSH", "queue", "one", "two"]), ":2\r\n");
    assert_eq!(send(&h, &["LPOP", "queue"]), "$3\r\none\r\n");
    assert_eq!(send(&h, &["RPOP", "queue"]), "$3\r\ntwo\r\n");

    // Emptied list is still present; popping it again yields null
    assert_eq!(send(&h, &["EXISTS", "queue"]), ":1\r\n");
    assert_eq!(send(&h, &["LPOP", "queue"]), "$-1\r\n");
    assert_eq!(send(&h, &["LRANGE", "queue", "0", "-1"]), "*0\r\n");
}

#[test]
fn expire_and_ttl() {
    let h = handler();

    send(&h, &["SET", "mykey", "value"]);
    assert_eq!(send(&h, &["TTL", "mykey"]), ":-1\r\n");
    assert_eq!(send(&h, &["EXPIRE", "mykey", "5"]), "+OK\r\n");

    let ttl = send(&h, &["TTL", "mykey"]);
    let secs: i64 = ttl.trim_start_matches(':').trim_end().parse().unwrap();
    assert!((1..=5).contains(&secs), "ttl was {}", secs);

    assert_eq!(send(&h, &["PERSIST", "mykey"]), ":1\r\n");
    assert_eq!(send(&h, &["TTL", "mykey"]), ":-1\r\n");

    send(&h, &["SET", "t", "v"]);
    assert_eq!(send(&h, &["EXPIRE", "t", "1"]), "+OK\r\n");
    assert_eq!(send(&h, &["TTL", "t"]), ":1\r\n");
}

#[test]
fn key_expires_after_deadline() {
    let h = handler();

    assert_eq!(send(&h, &["SET", "short", "lived", "1"]), "+OK\r\n");
    assert_eq!(send(&h, &["EXISTS", "short"]), ":1\r\n");

    sleep(Duration::from_millis(1100));

    assert_eq!(send(&h, &["EXISTS", "short"]), ":0\r\n");
    assert!(send(&h, &["GET", "short"]).starts_with("-KeyNotFound"));
    assert!(send(&h, &["TTL", "short"]).starts_with("-KeyNotFound"));
}

#[test]
fn flushall_is_idempotent() {
    let h = handler();

    send(&h, &["SET", "a", "1"]);
    send(&h, &["RPUSH", "b", "x"]);

    assert_eq!(send(&h, &["FLUSHALL"]), "+OK\r\n");
    assert_eq!(send(&h, &["EXISTS", "a"]), ":0\r\n");
    assert_eq!(send(&h, &["FLUSHALL"]), "+OK\r\n");
    assert!(h.storage().is_empty());
}

#[test]
fn validation_errors_on_the_wire() {
    let h = handler();

    assert_eq!(
        send(&h, &["HSET", "k", "f", "v"]),
        "-UnknownCommand unknown command 'HSET'\r\n"
    );
    assert_eq!(
        send(&h, &["GET", "a", "b"]),
        "-WrongNumberOfArguments wrong number of arguments for 'GET' command\r\n"
    );
    assert_eq!(
        send(&h, &["SET", "k"]),
        "-IncompleteCommand incomplete command\r\n"
    );
    assert!(send(&h, &["EXPIRE", "k", "soon"]).starts_with("-TypeError"));
    assert_eq!(send(&h, &["ping"]), "+PONG\r\n");
}

#[test]
fn binary_safe_values() {
    let h = handler();

    let frame = encode_command([&b"SET"[..], &b"bin"[..], &b"a\r\nb\0c"[..]]);
    assert_eq!(&h.handle(&frame)[..], b"+OK\r\n");

    let reply = h.handle(&encode_command(["GET", "bin"]));
    assert_eq!(&reply[..], b"$6\r\na\r\nb\0c\r\n");
}

#[test]
fn shared_store_across_handlers() {
    let storage = Arc::new(StorageEngine::new());
    let first = CommandHandler::new(Arc::clone(&storage));
    let second = first.clone();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let h = second.clone();
            std::thread::spawn(move || {
                for _ in 0..250 {
                    send(&h, &["INCR", "hits"]);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(send(&first, &["GET", "hits"]), "$4\r\n1000\r\n");
}
