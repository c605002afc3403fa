//! Interactive question loop.
//!
//! Thin terminal wrapper around [`Pipeline::answer`]: reads queries from
//! stdin until `bye` or end-of-input, prints the answer followed by one
//! citation line per grounding chunk. ANSI color is applied only when
//! stdout is a terminal.

use anyhow::Result;
use std::io::{self, BufRead, Write};

use crate::error::Error;
use crate::models::Answer;
use crate::pipeline::Pipeline;

struct Palette {
    query: &'static str,
    system: &'static str,
    agent: &'static str,
    source: &'static str,
    location: &'static str,
    reset: &'static str,
}

const COLOR: Palette = Palette {
    query: "\x1b[1;34m",
    system: "\x1b[1;32m",
    agent: "\x1b[1;33m",
    source: "\x1b[1;35m",
    location: "\x1b[1;36m",
    reset: "\x1b[0m",
};

const PLAIN: Palette = Palette {
    query: "",
    system: "",
    agent: "",
    source: "",
    location: "",
    reset: "",
};

pub async fn run_chat(pipeline: &Pipeline) -> Result<()> {
    let palette = if atty::is(atty::Stream::Stdout) {
        &COLOR
    } else {
        &PLAIN
    };

    let stdin = io::stdin();
    loop {
        print!("\n{}[QUERY]:{} ", palette.query, palette.reset);
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "bye" {
            break;
        }

        match pipeline.answer(question).await {
            Ok(answer) => {
                println!(
                    "\n{}[SYSTEM] Query processing complete.{}",
                    palette.system, palette.reset
                );
                print_answer(&answer, palette);
            }
            Err(Error::Generation { source, citations }) => {
                eprintln!("generation failed: {:#}", source);
                print_citations(&citations, palette);
            }
            Err(Error::Retrieval(e)) => {
                // Per-query failure; the loop stays alive.
                eprintln!("retrieval failed: {:#}", e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

fn print_answer(answer: &Answer, palette: &Palette) {
    println!("{}[AGENT]{}", palette.agent, palette.reset);
    println!("{}", answer.answer);
    print_citations(&answer.citations, palette);
}

fn print_citations(citations: &[crate::models::Citation], palette: &Palette) {
    if citations.is_empty() {
        return;
    }
    println!("\n{}[SOURCE]{}", palette.source, palette.reset);
    for citation in citations {
        println!("{}{}{}", palette.location, citation, palette.reset);
    }
}
