use std::fmt::Display;

use itertools::Itertools;

use crate::{Fsm, State};

fn flags(state: &State) -> Vec<&'static str> {
    let mut flags = vec![];
    if state.is_start() {
        flags.push("START");
    }
    if state.is_end() {
        flags.push("END");
    }
    flags
}

impl Display for Fsm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "==== FSM Summary ====")?;
        writeln!(f, "States: {}", self.size())?;
        writeln!(f, "Transitions: {}", self.transition_count())?;
        match self.start() {
            Some(start) => writeln!(f, "Start state: {start}")?,
            None => writeln!(f, "Start state: -")?,
        }
        writeln!(
            f,
            "End states: [{}]",
            self.accepting_states().map(|id| id.to_string()).join(", ")
        )?;
        writeln!(f)?;
        writeln!(f, "---- States ----")?;
        for state in self.states() {
            let flags = flags(state);
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" ({})", flags.join(", "))
            };
            writeln!(f, "[{}]{flags}, visits={}", state.id(), state.visit_count())?;
            for transition in self.transitions_from(state.id()) {
                writeln!(
                    f,
                    "    --[{}]--> {}",
                    transition.symbol(),
                    transition.target()
                )?;
            }
        }
        Ok(())
    }
}

impl Fsm {
    /// Renders the transition table, one row per live state and one column per symbol.
    pub fn transition_table(&self) -> String {
        let alphabet = self.alphabet();
        let mut builder = tabled::builder::Builder::default();
        builder.push_record(
            ["State", "Flags", "Visits"]
                .into_iter()
                .map(str::to_string)
                .chain(alphabet.iter().map(|sym| sym.to_string())),
        );
        for state in self.states() {
            let mut row = vec![
                state.id().to_string(),
                flags(state).join(","),
                state.visit_count().to_string(),
            ];
            for sym in &alphabet {
                match state.successor(sym) {
                    Some(target) => row.push(target.to_string()),
                    None => row.push("-".to_string()),
                }
            }
            builder.push_record(row);
        }

        builder
            .build()
            .with(tabled::settings::Style::rounded())
            .to_string()
    }
}
