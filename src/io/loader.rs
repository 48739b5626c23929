#[cfg(test)]
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Right-hand side of an instruction: a literal or a variable of the running process.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(f64),
    Variable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Set { target: String, value: Operand },
    Add { target: String, left: Operand, right: Operand },
    Read { target: String, file: String, token: Operand },
    Print(Operand),
    Jump(usize),
    JumpIfEof { variable: String, line: usize },
    Work,
    Fail(String),
    Exit,
    /// Spins in place and gives the CPU back every tick.
    Idle,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read program {source_id}: {error}")]
    Io {
        source_id: String,
        #[source]
        error: std::io::Error,
    },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[cfg(test)]
    #[error("no program named {0}")]
    NotFound(String),
}

/// Instruction listing of one program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Code {
    instructions: Vec<Instruction>,
}

impl Code {
    pub fn new(instructions: Vec<Instruction>) -> Code {
        Code { instructions }
    }

    pub fn idle() -> Code {
        Code::new(vec![Instruction::Idle])
    }

    pub fn parse(text: &str) -> Result<Code, LoadError> {
        let mut instructions = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let line = match line.split_once('#') {
                Some((code, _comment)) => code,
                None => line,
            };
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }

            instructions.push(parse_instruction(&words).map_err(|message| LoadError::Syntax {
                line: idx + 1,
                message,
            })?);
        }

        Ok(Code::new(instructions))
    }

    pub fn fetch(&self, program_counter: usize) -> Option<&Instruction> {
        self.instructions.get(program_counter)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

fn parse_instruction(words: &[&str]) -> Result<Instruction, String> {
    let expect = |count: usize| {
        if words.len() == count + 1 {
            Ok(())
        } else {
            Err(format!("`{}` takes {} operand(s), got {}", words[0], count, words.len() - 1))
        }
    };

    match words[0] {
        "set" => {
            expect(2)?;
            Ok(Instruction::Set { target: parse_variable(words[1])?, value: parse_operand(words[2]) })
        }
        "add" => {
            expect(3)?;
            Ok(Instruction::Add {
                target: parse_variable(words[1])?,
                left: parse_operand(words[2]),
                right: parse_operand(words[3]),
            })
        }
        "read" => {
            expect(3)?;
            Ok(Instruction::Read {
                target: parse_variable(words[1])?,
                file: words[2].to_string(),
                token: parse_operand(words[3]),
            })
        }
        "print" => {
            expect(1)?;
            Ok(Instruction::Print(parse_operand(words[1])))
        }
        "jump" => {
            expect(1)?;
            Ok(Instruction::Jump(parse_line(words[1])?))
        }
        "jump_if_eof" => {
            expect(2)?;
            Ok(Instruction::JumpIfEof { variable: parse_variable(words[1])?, line: parse_line(words[2])? })
        }
        "work" => {
            expect(0)?;
            Ok(Instruction::Work)
        }
        "fail" => Ok(Instruction::Fail(words[1..].join(" "))),
        "exit" => {
            expect(0)?;
            Ok(Instruction::Exit)
        }
        other => Err(format!("unknown instruction `{}`", other)),
    }
}

fn parse_operand(word: &str) -> Operand {
    match word.parse::<f64>() {
        Ok(number) => Operand::Literal(number),
        Err(_) => Operand::Variable(word.to_string()),
    }
}

fn parse_variable(word: &str) -> Result<String, String> {
    if word.parse::<f64>().is_ok() {
        return Err(format!("`{}` is not a variable name", word));
    }
    Ok(word.to_string())
}

fn parse_line(word: &str) -> Result<usize, String> {
    word.parse::<usize>().map_err(|_| format!("`{}` is not an instruction index", word))
}

/// Produces the code of a new process from its source identifier.
pub trait CodeLoader {
    fn load(&self, source_id: &str) -> Result<Code, LoadError>;
}

/// Loads programs from files under a base directory.
pub struct FileCodeLoader {
    base_dir: PathBuf,
}

impl FileCodeLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> FileCodeLoader {
        FileCodeLoader { base_dir: base_dir.into() }
    }
}

impl CodeLoader for FileCodeLoader {
    fn load(&self, source_id: &str) -> Result<Code, LoadError> {
        let path = self.base_dir.join(source_id);
        let text = fs::read_to_string(&path).map_err(|error| LoadError::Io {
            source_id: source_id.to_string(),
            error,
        })?;
        Code::parse(&text)
    }
}

/// Programs held in memory, keyed by source identifier.
#[cfg(test)]
#[derive(Default)]
pub struct SourceMap {
    sources: HashMap<String, String>,
}

#[cfg(test)]
impl SourceMap {
    pub fn new() -> SourceMap {
        SourceMap::default()
    }

    pub fn with(mut self, source_id: &str, text: &str) -> SourceMap {
        self.sources.insert(source_id.to_string(), text.to_string());
        self
    }
}

#[cfg(test)]
impl CodeLoader for SourceMap {
    fn load(&self, source_id: &str) -> Result<Code, LoadError> {
        let text = self
            .sources
            .get(source_id)
            .ok_or_else(|| LoadError::NotFound(source_id.to_string()))?;
        Code::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_parse_skips_comments_and_blank_lines() {
        let code = Code::parse("# header\n\nset x 4   # four\nprint x\n").unwrap();

        assert_eq!(code.len(), 2);
        assert_eq!(
            code.fetch(0),
            Some(&Instruction::Set { target: "x".to_string(), value: Operand::Literal(4.0) })
        );
        assert_eq!(code.fetch(1), Some(&Instruction::Print(Operand::Variable("x".to_string()))));
        assert_eq!(code.fetch(2), None);
    }

    #[test]
    fn test_code_parse_read_and_jumps() {
        let code = Code::parse("read n numbers.txt i\njump_if_eof n 3\njump 0\nexit").unwrap();

        assert_eq!(
            code.fetch(0),
            Some(&Instruction::Read {
                target: "n".to_string(),
                file: "numbers.txt".to_string(),
                token: Operand::Variable("i".to_string()),
            })
        );
        assert_eq!(code.fetch(1), Some(&Instruction::JumpIfEof { variable: "n".to_string(), line: 3 }));
        assert_eq!(code.fetch(2), Some(&Instruction::Jump(0)));
        assert_eq!(code.fetch(3), Some(&Instruction::Exit));
    }

    #[test]
    fn test_code_parse_fail_keeps_message() {
        let code = Code::parse("fail disk on fire").unwrap();
        assert_eq!(code.fetch(0), Some(&Instruction::Fail("disk on fire".to_string())));
    }

    #[test]
    fn test_code_parse_unknown_instruction() {
        let result = Code::parse("work\nteleport x");
        assert!(matches!(result, Err(LoadError::Syntax { line: 2, .. })));
    }

    #[test]
    fn test_code_parse_wrong_operand_count() {
        let result = Code::parse("add x 1");
        assert!(matches!(result, Err(LoadError::Syntax { line: 1, .. })));
    }

    #[test]
    fn test_code_parse_literal_target_rejected() {
        let result = Code::parse("set 3 4");
        assert!(matches!(result, Err(LoadError::Syntax { line: 1, .. })));
    }

    #[test]
    fn test_file_code_loader_load_programs() {
        let loader = FileCodeLoader::new("data/programs");

        let code = loader.load("sum_numbers.txt").unwrap();
        assert!(!code.is_empty());

        let result = loader.load("missing.txt");
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_source_map_load() {
        let loader = SourceMap::new().with("a", "work\nexit");

        assert_eq!(loader.load("a").unwrap().len(), 2);
        assert!(matches!(loader.load("b"), Err(LoadError::NotFound(_))));
    }
}
