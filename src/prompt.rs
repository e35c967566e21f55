//! Operator decision after the preview.

use std::io::{self, BufRead, Write};

use crate::commit::CommitMode;

const MENU: &str = "\nOptions:\n [1] Apply & KEEP Old (renamed to *_old)\n [2] Apply & DELETE Old\n [3] Discard All\n";

/// Ask for a commit mode until a valid choice is made.
///
/// Deleting originals needs a `y` confirmation; any other answer shows the
/// menu again. End of input means discard.
pub fn ask_operator<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<CommitMode> {
    write!(output, "{}", MENU)?;

    loop {
        let Some(choice) = read_answer(input, output, "\nEnter choice (1/2/3): ")? else {
            return Ok(CommitMode::Discard);
        };

        match choice.as_str() {
            "1" => return Ok(CommitMode::ReplaceKeepOld),
            "2" => {
                let Some(confirm) = read_answer(input, output, "⚠️ Confirm delete? (y/n): ")? else {
                    return Ok(CommitMode::Discard);
                };
                if confirm.eq_ignore_ascii_case("y") {
                    return Ok(CommitMode::ReplaceDeleteOld);
                }
            }
            "3" => return Ok(CommitMode::Discard),
            _ => {}
        }
    }
}

/// `None` on end of input
fn read_answer<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> io::Result<Option<String>> {
    write!(output, "{}", question)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
