use std::fmt::Display;

use anyhow::Error;

/// Exit with `1` instead of panicking when an operation of the binary fails.
pub trait NiceError<T> {
    /// Return the value, or print the error with all its causes and exit with `1`.
    fn nice_unwrap(self) -> T;

    /// Like `nice_unwrap`, but first print `message`.
    fn nice_expect<S: Display + Send + Sync + 'static>(self, message: S) -> T;
}

fn print_error(error: &Error) {
    debug!("{:?}", error);
    let mut chain = error.chain();
    if let Some(error) = chain.next() {
        eprintln!("Error: {error}");
    }
    for cause in chain {
        eprintln!("\nCaused by:\n    {cause}");
    }
}

impl<T> NiceError<T> for Result<T, Error> {
    fn nice_unwrap(self) -> T {
        self.unwrap_or_else(|e| {
            print_error(&e);
            std::process::exit(1)
        })
    }

    fn nice_expect<S: Display + Send + Sync + 'static>(self, message: S) -> T {
        self.unwrap_or_else(|e| {
            print_error(&e.context(message));
            std::process::exit(1)
        })
    }
}
