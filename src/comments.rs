//! Comment generation boundary.
//!
//! Comment text comes from an opaque text-to-text generator (a summarization
//! model, a script, a test double). This module only prepares its inputs,
//! batches calls, tidies its outputs, and maps them back onto the classes and
//! methods they describe.

use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::structure::Structure;

/// Returned by [`clean_comment`] when the generator produced no sentences.
pub const EMPTY_COMMENT: &str = "No comment generated";

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("comment generator failed: {0}")]
    Generator(String),

    #[error("comment generator returned {got} results for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("failed to run comment command: {0}")]
    Io(#[from] std::io::Error),
}

/// An opaque batch text-to-text function.
pub trait CommentGenerator: Send + Sync {
    /// One output per input, in order.
    fn generate_batch(&self, inputs: &[String]) -> Result<Vec<String>, CommentError>;

    fn generate(&self, input: &str) -> Result<String, CommentError> {
        let mut out = self.generate_batch(&[input.to_string()])?;
        match out.len() {
            1 => Ok(out.remove(0)),
            got => Err(CommentError::CountMismatch { expected: 1, got }),
        }
    }
}

/// Runs an external command once per batch: inputs go to stdin one per line,
/// outputs are read back one per line.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    /// Split a command line on whitespace into program and arguments.
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl CommentGenerator for CommandGenerator {
    fn generate_batch(&self, inputs: &[String]) -> Result<Vec<String>, CommentError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        // Stdin is fed from its own thread while stdout drains here, so a
        // child that answers as it reads never blocks on a full pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            let payload: String = inputs.iter().map(|input| format!("{}\n", input)).collect();
            thread::spawn(move || stdin.write_all(payload.as_bytes()))
        });

        let output = child.wait_with_output()?;
        if let Some(writer) = writer {
            writer
                .join()
                .map_err(|_| CommentError::Generator("stdin writer panicked".to_string()))??;
        }
        if !output.status.success() {
            return Err(CommentError::Generator(format!(
                "`{}` exited with {}",
                self.program, output.status
            )));
        }
        let outputs: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        if outputs.len() != inputs.len() {
            return Err(CommentError::CountMismatch {
                expected: inputs.len(),
                got: outputs.len(),
            });
        }
        Ok(outputs)
    }
}

/// Generated comments keyed by class and by class and method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comments {
    pub classes: BTreeMap<String, String>,
    pub methods: BTreeMap<String, BTreeMap<String, String>>,
}

impl Comments {
    pub fn class(&self, name: &str) -> Option<&str> {
        self.classes.get(name).map(String::as_str)
    }

    pub fn method(&self, class: &str, method: &str) -> Option<&str> {
        self.methods
            .get(class)
            .and_then(|m| m.get(method))
            .map(String::as_str)
    }

    pub fn insert_class(&mut self, name: impl Into<String>, comment: impl Into<String>) {
        self.classes.insert(name.into(), comment.into());
    }

    pub fn insert_method(
        &mut self,
        class: impl Into<String>,
        method: impl Into<String>,
        comment: impl Into<String>,
    ) {
        self.methods
            .entry(class.into())
            .or_default()
            .insert(method.into(), comment.into());
    }

    pub fn len(&self) -> usize {
        self.classes.len() + self.methods.values().map(BTreeMap::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Flatten code onto one line for the generator.
pub fn preprocess_code(code: &str) -> String {
    WHITESPACE.replace_all(code, " ").trim().to_string()
}

/// Sentence-case each sentence of a raw generator output.
pub fn clean_comment(raw: &str) -> String {
    let sentences: Vec<String> = raw
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let mut chars = s.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();

    if sentences.is_empty() {
        EMPTY_COMMENT.to_string()
    } else {
        format!("{}.", sentences.join(". "))
    }
}

#[derive(Debug, Clone)]
enum Target {
    Class(String),
    Method(String, String),
}

impl Target {
    fn describe(&self) -> String {
        match self {
            Target::Class(name) => format!("class {}", name),
            Target::Method(class, method) => format!("method {}.{}", class, method),
        }
    }
}

fn store(comments: &mut Comments, target: &Target, raw: &str) {
    let comment = clean_comment(raw);
    match target {
        Target::Class(name) => comments.insert_class(name.clone(), comment),
        Target::Method(class, method) => {
            comments.insert_method(class.clone(), method.clone(), comment)
        }
    }
}

/// Comment every class and method span in `structure`.
///
/// Inputs are sent in batches of `batch_size`. A failed batch is retried one
/// input at a time; inputs that still fail are logged and left without a
/// comment.
pub fn generate_comments(
    structure: &Structure,
    generator: &dyn CommentGenerator,
    batch_size: usize,
) -> Comments {
    let mut items: Vec<(Target, String)> = structure
        .classes
        .iter()
        .map(|c| (Target::Class(c.name.clone()), preprocess_code(&c.code)))
        .collect();
    for group in &structure.methods {
        for m in &group.methods {
            items.push((
                Target::Method(group.class.clone(), m.name.clone()),
                preprocess_code(&m.code),
            ));
        }
    }

    let mut comments = Comments::default();
    for chunk in items.chunks(batch_size.max(1)) {
        let inputs: Vec<String> = chunk.iter().map(|(_, input)| input.clone()).collect();
        let batch = generator.generate_batch(&inputs).and_then(|out| {
            if out.len() == inputs.len() {
                Ok(out)
            } else {
                Err(CommentError::CountMismatch {
                    expected: inputs.len(),
                    got: out.len(),
                })
            }
        });

        match batch {
            Ok(outputs) => {
                debug!(count = outputs.len(), "comment batch generated");
                for ((target, _), raw) in chunk.iter().zip(&outputs) {
                    store(&mut comments, target, raw);
                }
            }
            Err(e) => {
                warn!(error = %e, "comment batch failed, falling back to one at a time");
                for (target, input) in chunk {
                    match generator.generate(input) {
                        Ok(raw) => store(&mut comments, target, &raw),
                        Err(e) => warn!(error = %e, "no comment for {}", target.describe()),
                    }
                }
            }
        }
    }
    comments
}
