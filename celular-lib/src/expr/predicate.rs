//! A compiled predicate and the providers it depends on

use crate::Result;
use crate::providers::ProviderKind;
use cel_interpreter::Program;
use ohno::app_err;
use std::sync::Arc;

/// One compiled rule from the configuration.
#[derive(Debug, Clone)]
pub struct Predicate {
    index: usize,
    uses: Vec<ProviderKind>,
    program: Arc<Program>,
    source: String,
}

impl Predicate {
    /// Compile `source` into a predicate.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression cannot be parsed
    pub fn new(index: usize, uses: Vec<ProviderKind>, source: String) -> Result<Self> {
        let program = Program::compile(&source).map_err(|e| app_err!("could not compile expression #{index}: {e}"))?;

        Ok(Self {
            index,
            uses,
            program: Arc::new(program),
            source,
        })
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn uses(&self) -> &[ProviderKind] {
        &self.uses
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_compile_predicate() {
        let predicate = Predicate::new(3, vec![ProviderKind::Mounts], "size(mounts) > 0".to_string()).unwrap();
        assert_eq!(predicate.index(), 3);
        assert_eq!(predicate.uses(), &[ProviderKind::Mounts]);
        assert_eq!(predicate.source(), "size(mounts) > 0");
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_compile_error_names_the_index() {
        let err = Predicate::new(2, vec![ProviderKind::Users], "(users".to_string()).unwrap_err();
        assert!(err.to_string().contains("expression #2"));
    }
}
