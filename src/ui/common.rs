//! # UI Common Components
//!
//! Console plumbing shared by the menus: a reader/writer pair, numbered menu
//! rendering for any [`MenuChoice`] and the controls summary.
//!
//! Menus are fixed ordered lists resolved by exhaustive `match` on the choice
//! enum. Reaching end of input is reported as `None` so every menu can unwind
//! cleanly when stdin closes.

use crate::controller::sampling_loop::EXIT_KEY;
use crate::persistence::Keybinds;
use std::io::{self, BufRead, Write};

/// One entry of a numbered menu.
pub trait MenuChoice: Copy + Sized + 'static {
    /// Display order; entry `i` is selected by typing `i + 1`.
    const ALL: &'static [Self];

    fn label(self) -> &'static str;
}

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    /// Writes `text` without a newline and reads one trimmed line.
    pub fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        write!(self.output, "{text}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub fn say(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{text}")
    }

    /// Shows the numbered list until a valid entry is picked.
    pub fn choose<C: MenuChoice>(&mut self, title: &str) -> io::Result<Option<C>> {
        loop {
            writeln!(self.output, "\n{title}")?;
            for (index, choice) in C::ALL.iter().enumerate() {
                writeln!(self.output, "{}. {}", index + 1, choice.label())?;
            }

            let Some(answer) = self.prompt(&format!("Enter your choice (1-{}): ", C::ALL.len()))?
            else {
                return Ok(None);
            };

            let picked = answer
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|index| C::ALL.get(index));
            match picked {
                Some(choice) => return Ok(Some(*choice)),
                None => self.say("Invalid choice. Please try again.")?,
            }
        }
    }
}

/// Prints the active bindings the way a player reads them.
pub fn print_controls<W: Write>(out: &mut W, keybinds: &Keybinds) -> io::Result<()> {
    let movement = &keybinds.movement;
    let key = |id: Option<&crate::mapping::InputId>| {
        id.map(|id| id.as_str().to_uppercase())
            .unwrap_or_else(|| "?".to_string())
    };

    writeln!(out, "Controls:")?;
    writeln!(
        out,
        "{}{}{}{} - Character movement (left joystick)",
        key(movement.forward.as_ref()),
        key(movement.left.as_ref()),
        key(movement.backward.as_ref()),
        key(movement.right.as_ref()),
    )?;
    writeln!(out, "Mouse - Camera/look (right joystick)")?;

    for (action, binding) in &keybinds.buttons {
        writeln!(
            out,
            "{} - {} button",
            binding.to_string().to_uppercase(),
            action.to_uppercase()
        )?;
    }

    if let Some(dpad) = &keybinds.dpad {
        for (direction, id) in dpad.entries() {
            if id.is_some() {
                writeln!(out, "{} - D-pad {}", key(id), direction)?;
            }
        }
    }

    writeln!(out, "{EXIT_KEY} - Exit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Fruit {
        Apple,
        Pear,
    }

    impl MenuChoice for Fruit {
        const ALL: &'static [Self] = &[Fruit::Apple, Fruit::Pear];

        fn label(self) -> &'static str {
            match self {
                Fruit::Apple => "Apple",
                Fruit::Pear => "Pear",
            }
        }
    }

    fn console(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn choose_reprompts_on_invalid_input() {
        let mut console = console("0\nbanana\n2\n");
        assert_eq!(console.choose::<Fruit>("Fruit").unwrap(), Some(Fruit::Pear));

        let text = String::from_utf8(console.output().clone()).unwrap();
        assert_eq!(text.matches("Invalid choice. Please try again.").count(), 2);
        assert!(text.contains("1. Apple\n2. Pear\n"));
        assert!(text.contains("Enter your choice (1-2): "));
    }

    #[test]
    fn end_of_input_is_none() {
        let mut console = console("");
        assert_eq!(console.choose::<Fruit>("Fruit").unwrap(), None);
        assert_eq!(console.prompt("> ").unwrap(), None);
    }

    #[test]
    fn controls_summary_lists_bindings_and_exit() {
        let mut out = Vec::new();
        print_controls(&mut out, &Keybinds::default()).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Controls:\nWASD - Character movement (left joystick)\n"));
        assert!(text.contains("SPACE - CROSS button"));
        assert!(text.contains("POINTER:LEFT - EXAMPLE_MOUSE_BIND button"));
        assert!(text.contains("UP - D-pad up"));
        assert!(text.ends_with("' - Exit\n"));
    }
}
