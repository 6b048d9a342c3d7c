#![allow(clippy::module_name_repetitions)]
//! Pretty printing of matrices and vectors, for use in `trace!`-level
//! diagnostics when debugging the message-passing loop.

use super::prelude::*;

const PRECISION: usize = 3;

const RESET_TEXT: &str = "\x1b[0m";
const RED_TEXT: &str = "\x1b[31m";
const GREEN_TEXT: &str = "\x1b[32m";
const YELLOW_TEXT: &str = "\x1b[33m";
const MAGENTA_TEXT: &str = "\x1b[35m";

const BAR: char = '│';

/// Count the number of integral digits in a floating point number.
/// ```
/// use gbp_linalg::pretty_print::num_of_integral_digits;
/// assert_eq!(num_of_integral_digits(0.0), Some(1));
/// assert_eq!(num_of_integral_digits(1.0), Some(1));
/// assert_eq!(num_of_integral_digits(10.0), Some(2));
/// assert_eq!(num_of_integral_digits(100.0), Some(3));
/// assert_eq!(num_of_integral_digits(f64::NAN), None);
/// assert_eq!(num_of_integral_digits(f64::INFINITY), None);
/// ```
#[must_use]
pub fn num_of_integral_digits(mut f: f64) -> Option<usize> {
    if f.is_nan() || f.is_infinite() {
        return None;
    }

    let mut count = 0_usize;

    if f.is_sign_negative() {
        f = -f;
        count += 1;
    }

    if f < 1.0 {
        count += 1;
    }

    while f >= 1.0 {
        f /= 10.0;
        count += 1;
    }

    Some(count)
}

/// Map a floating point number to an ansi color string.
fn float_color(f: f64) -> &'static str {
    if f.is_nan() {
        MAGENTA_TEXT
    } else if f.is_infinite() {
        YELLOW_TEXT
    } else if f.is_sign_negative() {
        RED_TEXT
    } else if f > 0.0 {
        GREEN_TEXT
    } else {
        RESET_TEXT
    }
}

fn cell_width<T: GbpFloat>(values: impl Iterator<Item = T>) -> usize {
    let mut max_width = 0;
    for x in values {
        let width =
            num_of_integral_digits(x.to_f64().expect("x is representable as f64")).unwrap_or(0)
                + 1;
        if width > max_width {
            max_width = width;
        }
    }
    if max_width == 0 {
        max_width = 5;
    }
    max_width + 1 + PRECISION
}

/// Render a matrix as a boxed, color-coded string. Not intended to be called
/// directly; use [`pretty_print_matrix!`].
pub fn _pretty_print_matrix<T: GbpFloat>(matrix: &Matrix<T>, name: Option<&str>) -> String {
    let (nrows, ncols) = matrix.dim();
    let width = cell_width(matrix.iter().copied());

    let mut out = String::new();
    if let Some(name) = name {
        out.push_str(&format!("{name} ({nrows}x{ncols}):\n"));
    }
    for i in 0..nrows {
        out.push(BAR);
        for j in 0..ncols {
            let x = matrix[[i, j]].to_f64().expect("x is representable as f64");
            out.push_str(&format!(
                "{}{:>width$.PRECISION$}{}",
                float_color(x),
                x,
                RESET_TEXT,
                width = width
            ));
        }
        out.push(BAR);
        out.push('\n');
    }
    out
}

/// Render a vector as a boxed, color-coded string. Not intended to be called
/// directly; use [`pretty_print_vector!`].
pub fn _pretty_print_vector<T: GbpFloat>(vector: &Vector<T>, name: Option<&str>) -> String {
    let width = cell_width(vector.iter().copied());
    let mut out = String::new();
    if let Some(name) = name {
        out.push_str(&format!("{name} ({}):\n", vector.len()));
    }
    out.push(BAR);
    for x in vector.iter() {
        let x = x.to_f64().expect("x is representable as f64");
        out.push_str(&format!(
            "{}{:>width$.PRECISION$}{}",
            float_color(x),
            x,
            RESET_TEXT,
            width = width
        ));
    }
    out.push(BAR);
    out
}

pub trait PrettyPrintMatrix<T: GbpFloat> {
    fn render(&self, name: Option<&str>) -> String;
}

impl<T: GbpFloat> PrettyPrintMatrix<T> for Matrix<T> {
    fn render(&self, name: Option<&str>) -> String {
        _pretty_print_matrix(self, name)
    }
}

pub trait PrettyPrintVector<T: GbpFloat> {
    fn render(&self, name: Option<&str>) -> String;
}

impl<T: GbpFloat> PrettyPrintVector<T> for Vector<T> {
    fn render(&self, name: Option<&str>) -> String {
        _pretty_print_vector(self, name)
    }
}

#[macro_export]
macro_rules! pretty_print_matrix {
    ($matrix:expr) => {
        $crate::pretty_print::PrettyPrintMatrix::render($matrix, Some(stringify!($matrix)))
    };
    ($matrix:expr, $name:expr) => {
        $crate::pretty_print::PrettyPrintMatrix::render($matrix, Some($name))
    };
}

#[macro_export]
macro_rules! pretty_print_vector {
    ($vector:expr) => {
        $crate::pretty_print::PrettyPrintVector::render($vector, Some(stringify!($vector)))
    };
    ($vector:expr, $name:expr) => {
        $crate::pretty_print::PrettyPrintVector::render($vector, Some($name))
    };
}
