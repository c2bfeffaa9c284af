//! Model-name checking against the declared variable list.
//!
//! A model name is a `:`-separated list of components. Each component is a
//! run of variable abbreviations, split at capital letters (`AbC` is `Ab`,
//! `C`), except the independent-variable shorthand, which stays whole:
//! `IV` in directed systems, `IVI` in neutral ones.

use std::collections::BTreeSet;

use crate::contract::VariableListV1;

const DIRECTED_SHORTHAND: &str = "IV";
const NEUTRAL_SHORTHAND: &str = "IVI";

/// Suggestion attached to a name error involving the IV shorthand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShorthandHint {
    /// The other system kind's shorthand was written.
    Swapped {
        expected: &'static str,
        found: &'static str,
    },
    /// The shorthand component may have been forgotten.
    Missing { expected: &'static str },
}

impl std::fmt::Display for ShorthandHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Swapped { expected, found } => {
                write!(f, "did you mean '{expected}' instead of '{found}'?")
            }
            Self::Missing { expected } => write!(f, "did you forget the {expected} component?"),
        }
    }
}

/// Why a model name does not fit the declared variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelNameError {
    EmptyName,
    /// Declared variables absent from the model (no shorthand present).
    MissingVariables {
        missing: Vec<String>,
        hint: ShorthandHint,
    },
    /// Variables used in the model but not declared.
    UndeclaredVariables {
        undeclared: Vec<String>,
        hint: Option<ShorthandHint>,
    },
    /// A directed-system component lacks the dependent variable.
    MissingDependent { component: String, dv: String },
}

impl std::fmt::Display for ModelNameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "model name is empty"),
            Self::MissingVariables { missing, hint } => write!(
                f,
                "not all declared variables are present (missing: {}); {hint}",
                missing.join(", ")
            ),
            Self::UndeclaredVariables { undeclared, hint } => {
                write!(
                    f,
                    "variables not declared in the variable list: {}",
                    undeclared.join(", ")
                )?;
                if let Some(hint) = hint {
                    write!(f, "; {hint}")?;
                }
                Ok(())
            }
            Self::MissingDependent { component, dv } => {
                write!(f, "component '{component}' is missing the DV '{dv}'")
            }
        }
    }
}

impl std::error::Error for ModelNameError {}

fn shorthand(directed: bool) -> &'static str {
    if directed {
        DIRECTED_SHORTHAND
    } else {
        NEUTRAL_SHORTHAND
    }
}

fn other_shorthand(directed: bool) -> &'static str {
    shorthand(!directed)
}

/// Split a string into runs that each start with an uppercase ASCII letter.
/// Characters before the first capital are dropped.
fn split_caps(s: &str) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    for ch in s.chars() {
        if ch.is_ascii_uppercase() {
            parts.push(ch.to_string());
        } else if let Some(last) = parts.last_mut() {
            last.push(ch);
        }
    }
    parts
}

/// Split a model name into components of variable abbreviations.
#[must_use]
pub fn split_model(name: &str, directed: bool) -> Vec<Vec<String>> {
    let iv = shorthand(directed);
    name.split(':')
        .map(|comp| {
            if comp == iv {
                vec![comp.to_string()]
            } else {
                split_caps(comp)
            }
        })
        .collect()
}

/// Check a model name against the declared variables.
///
/// # Errors
///
/// Returns the first [`ModelNameError`] found, in this order: missing
/// declared variables (only when the shorthand is absent), undeclared
/// variables, then components lacking the dependent variable.
pub fn check_model_name(
    name: &str,
    variables: &VariableListV1,
    directed: bool,
) -> Result<(), ModelNameError> {
    if name.is_empty() {
        return Err(ModelNameError::EmptyName);
    }

    let model = split_model(name, directed);
    let iv = shorthand(directed);
    let swapped_form = split_caps(other_shorthand(directed));

    let has_shorthand = model.iter().any(|c| c.len() == 1 && c[0] == iv);
    let saw_swapped = model.iter().any(|c| *c == swapped_form);
    let swapped_hint = ShorthandHint::Swapped {
        expected: iv,
        found: other_shorthand(directed),
    };

    let declared: BTreeSet<&str> = variables.abbrevs.iter().map(String::as_str).collect();
    let mut used: BTreeSet<&str> = model.iter().flatten().map(String::as_str).collect();
    used.remove(iv);

    if !has_shorthand {
        let missing: Vec<String> = declared
            .difference(&used)
            .map(|s| (*s).to_string())
            .collect();
        if !missing.is_empty() {
            let hint = if saw_swapped {
                swapped_hint
            } else {
                ShorthandHint::Missing { expected: iv }
            };
            return Err(ModelNameError::MissingVariables { missing, hint });
        }
    }

    let undeclared: Vec<String> = used
        .difference(&declared)
        .map(|s| (*s).to_string())
        .collect();
    if !undeclared.is_empty() {
        let only_iv_letters = undeclared == ["I", "V"];
        let hint = (saw_swapped || only_iv_letters).then_some(swapped_hint);
        return Err(ModelNameError::UndeclaredVariables { undeclared, hint });
    }

    if directed {
        if let Some(dv) = &variables.dependent {
            for comp in &model {
                let is_shorthand = comp.len() == 1 && comp[0] == iv;
                if !is_shorthand && !comp.contains(dv) {
                    return Err(ModelNameError::MissingDependent {
                        component: comp.concat(),
                        dv: dv.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}
