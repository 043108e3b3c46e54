//! Interactive adapters. The core library never prompts.

use std::io::{self, BufRead, Write};

use car_catalog_core::SizePolicy;

/// Offer the preset menu until a valid choice is entered
pub fn choose_size_policy<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<SizePolicy> {
    let mut line = String::new();

    loop {
        writeln!(output, "Select output size:")?;
        for (index, preset) in SizePolicy::PRESETS.iter().enumerate() {
            writeln!(output, "  {}) {}", index + 1, preset)?;
        }
        write!(output, "Choice [1]: ")?;
        output.flush()?; // Make sure the prompt is immediately displayed

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no size selected"));
        }

        let choice = line.trim();
        if choice.is_empty() {
            return Ok(SizePolicy::PRESETS[0]);
        }
        match choice.parse::<usize>() {
            Ok(n) if (1..=SizePolicy::PRESETS.len()).contains(&n) => return Ok(SizePolicy::PRESETS[n - 1]),
            _ => writeln!(output, "Invalid choice: {}", choice)?,
        }
    }
}

/// Print `prompt` and return the operator's answer without the line ending
pub fn read_token<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> io::Result<String> {
    write!(output, "{}", prompt)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string())
}
