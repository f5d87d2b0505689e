use super::*;
use clap::Parser;

#[test]
fn test_parse_command_basic_controls() {
    assert_eq!(CliApp::parse_command("play").unwrap(), SessionCommand::Play);
    assert_eq!(CliApp::parse_command("pause").unwrap(), SessionCommand::Pause);
    assert_eq!(CliApp::parse_command("  toggle  ").unwrap(), SessionCommand::Toggle);
    assert_eq!(CliApp::parse_command("status").unwrap(), SessionCommand::Status);
    assert_eq!(CliApp::parse_command("events").unwrap(), SessionCommand::Events);
    assert_eq!(CliApp::parse_command("exit").unwrap(), SessionCommand::Exit);
    assert_eq!(CliApp::parse_command("quit").unwrap(), SessionCommand::Exit);
}

#[test]
fn test_parse_command_seek() {
    assert_eq!(
        CliApp::parse_command("seek 40").unwrap(),
        SessionCommand::Seek { percent: 0.4 }
    );
    assert_eq!(
        CliApp::parse_command("seek 100%").unwrap(),
        SessionCommand::Seek { percent: 1.0 }
    );

    assert!(matches!(
        CliApp::parse_command("seek"),
        Err(ParseError::MissingArgument { .. })
    ));
    assert!(matches!(
        CliApp::parse_command("seek 140"),
        Err(ParseError::InvalidArgument { .. })
    ));
    assert!(matches!(
        CliApp::parse_command("seek abc"),
        Err(ParseError::InvalidArgument { .. })
    ));
}

#[test]
fn test_parse_command_drag() {
    assert_eq!(CliApp::parse_command("drag start").unwrap(), SessionCommand::DragStart);
    assert_eq!(
        CliApp::parse_command("drag move 25").unwrap(),
        SessionCommand::DragMove { percent: 0.25 }
    );
    assert_eq!(
        CliApp::parse_command("drag end 50%").unwrap(),
        SessionCommand::DragEnd { percent: 0.5 }
    );

    match CliApp::parse_command("drag move") {
        Err(ParseError::MissingArgument { command, argument }) => {
            assert_eq!(command, "drag move");
            assert_eq!(argument, "percent");
        }
        other => panic!("Expected MissingArgument, got {:?}", other),
    }
    match CliApp::parse_command("drag sideways") {
        Err(ParseError::UnknownCommand { command }) => assert_eq!(command, "drag sideways"),
        other => panic!("Expected UnknownCommand, got {:?}", other),
    }
    assert!(matches!(
        CliApp::parse_command("drag"),
        Err(ParseError::MissingArgument { .. })
    ));
}

#[test]
fn test_parse_command_quality_and_rate() {
    assert_eq!(
        CliApp::parse_command("quality 2").unwrap(),
        SessionCommand::Quality { index: 2 }
    );
    assert!(matches!(
        CliApp::parse_command("quality -1"),
        Err(ParseError::InvalidArgument { .. })
    ));

    assert_eq!(
        CliApp::parse_command("rate 1.5").unwrap(),
        SessionCommand::Rate { rate: 1.5 }
    );
    assert_eq!(
        CliApp::parse_command("rate 2x").unwrap(),
        SessionCommand::Rate { rate: 2.0 }
    );
    assert!(matches!(
        CliApp::parse_command("rate 0"),
        Err(ParseError::InvalidArgument { .. })
    ));
}

#[test]
fn test_parse_command_volume() {
    assert_eq!(
        CliApp::parse_command("volume 75").unwrap(),
        SessionCommand::Volume { level: 75 }
    );
    assert_eq!(
        CliApp::parse_command("volume 0").unwrap(),
        SessionCommand::Volume { level: 0 }
    );

    match CliApp::parse_command("volume 150") {
        Err(ParseError::InvalidArgument { expected, .. }) => assert_eq!(expected, "0-100"),
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }
    match CliApp::parse_command("volume loud") {
        Err(ParseError::InvalidArgument { expected, .. }) => assert_eq!(expected, "number 0-100"),
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }
}

#[test]
fn test_parse_command_key() {
    assert_eq!(
        CliApp::parse_command("key space").unwrap(),
        SessionCommand::Key { key: Key::Space }
    );
    assert_eq!(
        CliApp::parse_command("key left").unwrap(),
        SessionCommand::Key { key: Key::ArrowLeft }
    );
    assert_eq!(
        CliApp::parse_command("key right").unwrap(),
        SessionCommand::Key { key: Key::ArrowRight }
    );
    assert!(matches!(
        CliApp::parse_command("key enter"),
        Err(ParseError::InvalidArgument { .. })
    ));
}

#[test]
fn test_parse_command_errors() {
    assert!(matches!(CliApp::parse_command(""), Err(ParseError::EmptyCommand)));
    assert!(matches!(CliApp::parse_command("   "), Err(ParseError::EmptyCommand)));
    assert!(matches!(CliApp::parse_command("help"), Err(ParseError::HelpRequested)));
    match CliApp::parse_command("rewind") {
        Err(ParseError::UnknownCommand { command }) => assert_eq!(command, "rewind"),
        other => panic!("Expected UnknownCommand, got {:?}", other),
    }
}

#[test]
fn test_parse_error_messages() {
    let error = ParseError::InvalidArgument {
        argument: "volume level".to_string(),
        value: "150".to_string(),
        expected: "0-100".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "Invalid argument volume level: got '150', expected 0-100"
    );
    assert_eq!(
        ParseError::MissingArgument {
            command: "seek".to_string(),
            argument: "percent".to_string(),
        }
        .to_string(),
        "Missing argument for seek: percent"
    );
}

#[test]
fn test_clap_waveform_arguments() {
    let cli = CliApp::try_parse_from([
        "scrubline", "waveform", "song.wav", "--width", "80", "--divider", "4", "--progress", "25",
    ])
    .unwrap();

    match cli.command {
        Commands::Waveform {
            path,
            width,
            height,
            divider,
            merge,
            progress,
        } => {
            assert_eq!(path, PathBuf::from("song.wav"));
            assert_eq!(width, Some(80));
            assert_eq!(height, None);
            assert_eq!(divider, Some(4));
            assert_eq!(merge, None);
            assert_eq!(progress, 25.0);
        }
        other => panic!("Expected Waveform command, got {:?}", other),
    }
}

#[test]
fn test_clap_preview_arguments() {
    let cli = CliApp::try_parse_from(["scrubline", "preview", "master.m3u8", "--levels", "240,480"]).unwrap();
    match cli.command {
        Commands::Preview {
            source,
            duration,
            levels,
        } => {
            assert_eq!(source, "master.m3u8");
            assert_eq!(duration, 120.0);
            assert_eq!(levels, vec![240, 480]);
        }
        other => panic!("Expected Preview command, got {:?}", other),
    }

    let defaults = CliApp::try_parse_from(["scrubline", "preview", "clip.mp4"]).unwrap();
    match defaults.command {
        Commands::Preview { levels, .. } => assert_eq!(levels, vec![360, 720, 1080]),
        other => panic!("Expected Preview command, got {:?}", other),
    }

    assert!(CliApp::try_parse_from(["scrubline"]).is_err());
}

#[test]
fn test_expand_path() {
    let expanded = CliApp::expand_path("~/Music/song.flac");
    assert!(!expanded.to_string_lossy().starts_with('~'));
    assert!(expanded.to_string_lossy().ends_with("Music/song.flac"));

    assert_eq!(
        CliApp::expand_path("/absolute/song.wav"),
        PathBuf::from("/absolute/song.wav")
    );
    assert_eq!(CliApp::expand_path("relative.wav"), PathBuf::from("relative.wav"));
}
