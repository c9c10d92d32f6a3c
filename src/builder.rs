use core::fmt;

use crate::context::Context;
use crate::error::Error;
use crate::multi::Multi8;

/// Assembles a context and a program image into a loaded machine.
pub struct Builder<'a, C: Context> {
    context: Option<C>,
    program: Option<&'a [u8]>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BuildError {
    MissingContext,
    MissingProgram,
    Load(Error),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::MissingContext => write!(f, "context not provided"),
            BuildError::MissingProgram => write!(f, "program not provided"),
            BuildError::Load(e) => e.fmt(f),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BuildError {}

impl<'a, C: Context> Builder<'a, C> {
    pub fn new() -> Self {
        Self {
            context: None,
            program: None,
        }
    }

    pub fn with_context(mut self, ctx: C) -> Self {
        self.context = Some(ctx);
        self
    }

    pub fn with_program(mut self, prog: &'a [u8]) -> Self {
        self.program = Some(prog);
        self
    }

    pub fn build(self) -> Result<Multi8<C>, BuildError> {
        let context = self.context.ok_or(BuildError::MissingContext)?;
        let program = self.program.ok_or(BuildError::MissingProgram)?;
        Multi8::load(context, program).map_err(BuildError::Load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::TestingContext;

    #[test]
    fn with_context_and_prog() {
        let result = Builder::new()
            .with_context(TestingContext::new(0))
            .with_program(&[])
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn with_context_only() {
        let result = Builder::new().with_context(TestingContext::new(0)).build();
        assert_eq!(result.err(), Some(BuildError::MissingProgram));
    }

    #[test]
    fn with_program_only() {
        let result = Builder::<'_, TestingContext>::new()
            .with_program(&[])
            .build();
        assert_eq!(result.err(), Some(BuildError::MissingContext));
    }

    #[test]
    fn oversized_program() {
        let image = [0u8; 0x10000];
        let result = Builder::new()
            .with_context(TestingContext::new(0))
            .with_program(&image[..])
            .build();
        assert_eq!(
            result.err(),
            Some(BuildError::Load(Error::ProgramTooLarge { len: 0x10000 })),
        );
    }
}
