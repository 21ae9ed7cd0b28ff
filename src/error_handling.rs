use std::fmt::{Debug, Display};
use std::path::PathBuf;

pub trait ErrorType: Display + Debug + PartialEq {}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize
}

impl Location {
    pub fn line(line: usize) -> Self {
        Location {
            file: PathBuf::new(),
            line
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.file.as_os_str().is_empty() {
            write!(f, "line {}", self.line)
        } else if self.line == 0 {
            write!(f, "{}", self.file.display())
        } else {
            write!(f, "{}:{}", self.file.display(), self.line)
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Error<T: ErrorType> {
    pub location: Location,
    pub error: T
}

impl<T: ErrorType> Display for Error<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]  {}", self.location, self.error)
    }
}

impl<T: ErrorType> std::error::Error for Error<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display() {
        assert_eq!(Location::line(4).to_string(), "line 4");
        assert_eq!(Location { file: PathBuf::from("g.cfg"), line: 0 }.to_string(), "g.cfg");
        assert_eq!(Location { file: PathBuf::from("g.cfg"), line: 7 }.to_string(), "g.cfg:7");
    }
}
