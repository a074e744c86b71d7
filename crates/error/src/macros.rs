/// Asserts the given expression returns an `Err` whose value matches the pattern.
#[macro_export]
macro_rules! assert_err {
    ($f:expr, $pat:pat) => {{
        match $f {
            Err($pat) => {}
            other => panic!(
                "Expected an error matching `{}`, got {:?}",
                stringify!($pat),
                other
            ),
        }
    }};
}

/// Constructs a [`crate::Error::InvalidData`] for the given format string.
#[macro_export]
macro_rules! errdata {
    ($($args:tt)*) => { $crate::Error::InvalidData(format!($($args)*)).into() };
}

/// Constructs a [`crate::Error::InvalidInput`] for the given format string.
#[macro_export]
macro_rules! errinput {
    ($($args:tt)*) => { $crate::Error::InvalidInput(format!($($args)*)).into() };
}
