//! Commandes stdin du client headless

use deckhub_contracts::Layout;

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Press { row: u16, col: u16 },
    Layout(Layout),
    Page(String),
    Show,
    Quit,
}

fn coordinate(what: &'static str, value: &str) -> Result<u16, ClientError> {
    value
        .parse()
        .map_err(|_| ClientError::BadArgument { what, value: value.to_string() })
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, ClientError> {
        let words: Vec<&str> = line.split_whitespace().collect();

        match words.as_slice() {
            ["press", row, col] => Ok(Command::Press {
                row: coordinate("row", row)?,
                col: coordinate("column", col)?,
            }),
            ["layout", shape] => Ok(Command::Layout(shape.parse()?)),
            ["page", id] => Ok(Command::Page(id.to_string())),
            ["show"] => Ok(Command::Show),
            ["quit" | "exit"] => Ok(Command::Quit),
            _ => Err(ClientError::UnknownCommand(line.trim().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("press 0 3").unwrap(), Command::Press { row: 0, col: 3 });
        assert_eq!(Command::parse("  page page2 ").unwrap(), Command::Page("page2".into()));
        assert_eq!(Command::parse("layout 3x5").unwrap(), Command::Layout(Layout::new(3, 5).unwrap()));
        assert_eq!(Command::parse("show").unwrap(), Command::Show);
        assert_eq!(Command::parse("exit").unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(Command::parse(""), Err(ClientError::UnknownCommand(_))));
        assert!(matches!(
            Command::parse("press a 1"),
            Err(ClientError::BadArgument { what: "row", .. })
        ));
        assert!(matches!(Command::parse("press 1"), Err(ClientError::UnknownCommand(_))));
        assert!(matches!(Command::parse("layout 0x4"), Err(ClientError::Contract(_))));
        assert!(matches!(Command::parse("dance"), Err(ClientError::UnknownCommand(_))));
    }
}
