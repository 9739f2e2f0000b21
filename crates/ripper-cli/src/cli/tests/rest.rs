//! Tests for status, stop, remove, clear, requeue, bookmark, sites and completions.

use super::parse;
use crate::cli::{BookmarkAction, CliCommand};

#[test]
fn cli_parse_sites_and_status() {
    assert!(matches!(parse(&["ripper", "sites"]), CliCommand::Sites));
    assert!(matches!(parse(&["ripper", "status"]), CliCommand::Status));
}

#[test]
fn cli_parse_stop() {
    match parse(&["ripper", "stop"]) {
        CliCommand::Stop { id } => assert!(id.is_none()),
        _ => panic!("expected Stop"),
    }
    match parse(&["ripper", "stop", "7"]) {
        CliCommand::Stop { id } => assert_eq!(id, Some(7)),
        _ => panic!("expected Stop with id"),
    }
}

#[test]
fn cli_parse_remove_clear_requeue() {
    match parse(&["ripper", "remove", "99"]) {
        CliCommand::Remove { id } => assert_eq!(id, 99),
        _ => panic!("expected Remove"),
    }
    assert!(matches!(parse(&["ripper", "clear"]), CliCommand::Clear));
    match parse(&["ripper", "requeue", "3"]) {
        CliCommand::Requeue { id } => assert_eq!(id, 3),
        _ => panic!("expected Requeue"),
    }
}

#[test]
fn cli_parse_remove_requires_numeric_id() {
    assert!(<crate::cli::Cli as clap::Parser>::try_parse_from(["ripper", "remove", "abc"]).is_err());
}

#[test]
fn cli_parse_bookmark() {
    match parse(&["ripper", "bookmark", "add", "https://example.com/t"]) {
        CliCommand::Bookmark {
            action: BookmarkAction::Add { url },
        } => assert_eq!(url, "https://example.com/t"),
        _ => panic!("expected Bookmark Add"),
    }
    match parse(&["ripper", "bookmark", "remove", "https://example.com/t"]) {
        CliCommand::Bookmark {
            action: BookmarkAction::Remove { url },
        } => assert_eq!(url, "https://example.com/t"),
        _ => panic!("expected Bookmark Remove"),
    }
    assert!(matches!(
        parse(&["ripper", "bookmark", "list"]),
        CliCommand::Bookmark {
            action: BookmarkAction::List
        }
    ));
}

#[test]
fn cli_parse_completions_and_man() {
    match parse(&["ripper", "completions", "bash"]) {
        CliCommand::Completions { shell } => assert_eq!(shell, clap_complete::Shell::Bash),
        _ => panic!("expected Completions"),
    }
    assert!(matches!(parse(&["ripper", "man"]), CliCommand::Man));
}

#[test]
fn cli_definition_is_consistent() {
    use clap::CommandFactory;
    crate::cli::Cli::command().debug_assert();
}

#[test]
fn live_queue_commands_go_to_the_running_engine() {
    use crate::cli::control_socket::ControlCommand;

    let cases = [
        (vec!["ripper", "stop"], Some(ControlCommand::StopAll)),
        (vec!["ripper", "stop", "4"], Some(ControlCommand::Stop(4))),
        (vec!["ripper", "remove", "5"], Some(ControlCommand::Remove(5))),
        (vec!["ripper", "clear"], Some(ControlCommand::Clear)),
        (vec!["ripper", "requeue", "6"], Some(ControlCommand::Requeue(6))),
        (vec!["ripper", "status"], Some(ControlCommand::Status)),
        (vec!["ripper", "sites"], None),
        (vec!["ripper", "bookmark", "list"], None),
    ];
    for (args, expected) in cases {
        assert_eq!(parse(&args).control_request(), expected, "{args:?}");
    }
}

#[test]
fn add_and_run_refuse_to_overlap_a_run() {
    assert!(parse(&["ripper", "add", "https://example.com/t"]).needs_idle_queue());
    assert!(parse(&["ripper", "run"]).needs_idle_queue());
    assert!(!parse(&["ripper", "status"]).needs_idle_queue());
    assert!(!parse(&["ripper", "bookmark", "add", "https://example.com/t"]).needs_idle_queue());
}
