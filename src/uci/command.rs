#[derive(Debug, Clone)]
pub enum UciCommand {
    Uci,
    IsReady,
    UciNewGame,
    Position(Vec<String>),
    Go(Vec<String>),
    SetOption(Vec<String>),
    Stop,
    Quit,
    Eval,
    Display,
    Unknown(String),
}

pub fn parse_uci_command(line: &str) -> Option<UciCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parts: Vec<&str> = trimmed.split_whitespace().collect();

    let owned_parts = || parts.iter().map(|p| (*p).to_string()).collect::<Vec<String>>();

    let cmd = match parts[0] {
        "uci" => UciCommand::Uci,
        "isready" => UciCommand::IsReady,
        "ucinewgame" => UciCommand::UciNewGame,
        "position" => UciCommand::Position(owned_parts()),
        "go" => UciCommand::Go(owned_parts()),
        "setoption" => UciCommand::SetOption(owned_parts()),
        "stop" => UciCommand::Stop,
        "quit" => UciCommand::Quit,
        "eval" => UciCommand::Eval,
        "d" => UciCommand::Display,
        _ => UciCommand::Unknown(trimmed.to_string()),
    };

    Some(cmd)
}
