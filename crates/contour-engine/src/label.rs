//! Text labels for contour values.

use crate::config::MIN_LOG_BASE;

/// Format a contour value for display.
///
/// The number of decimals follows the magnitude of the value. With a log
/// base above 1.01 the value is treated as an exponent and the label shows
/// `log_base^value`.
pub fn format_label(value: f32, log_base: f32) -> String {
    format_shifted_label(value as f64, 0.0, log_base)
}

/// Like [`format_label`], for a value that was shifted down by `shift`
/// during preprocessing. Precision is chosen from the unshifted magnitude.
pub(crate) fn format_shifted_label(value: f64, shift: f64, log_base: f32) -> String {
    let fval = (value - shift).abs();

    let (dvalue, mut text) = if log_base > MIN_LOG_BASE {
        let ilog = (fval + 0.01) as i64;
        let exponent = if fval - (ilog as f64) < 0.05 {
            if value < 0.0 {
                -(ilog as f64)
            } else {
                ilog as f64
            }
        } else {
            value
        };
        let dvalue = (log_base as f64).powf(exponent);
        let text = if !(-4.0..=6.0).contains(&exponent) {
            let precision = if log_base < 3.0 {
                3
            } else if log_base < 6.0 {
                2
            } else {
                1
            };
            c_exponential(dvalue, precision)
        } else {
            format!("{:.5}", dvalue)
        };
        (dvalue, text)
    } else {
        let ndec = decimals_for(fval);
        let fudge = 10.0_f64.powi(-2 * ndec as i32).clamp(1.0e-12, 1.0e-7);
        let dvalue = if value < 0.0 {
            value - fudge
        } else {
            value + fudge
        };
        let text = if ndec >= 6 {
            c_general(dvalue, ndec)
        } else {
            format!("{:.*}", ndec, dvalue)
        };
        (dvalue, text)
    };

    if dvalue.abs() > 9.0e6 {
        text = c_exponential(dvalue, 2);
    }

    if !text.contains('e') {
        strip_trailing_zeros(&mut text);
    }

    if dvalue.abs() >= 1.0 && text.len() > 1 && text.starts_with('0') {
        text.remove(0);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

/// Decimal places for a value of magnitude `fval`.
fn decimals_for(fval: f64) -> usize {
    let mut ilog = if fval > 0.0 {
        fval.log10() as i32
    } else {
        1
    };
    ilog -= 1;

    let ndec = if fval < 0.5 {
        (2 - ilog).max(0)
    } else if fval < 5.0 {
        3
    } else if fval < 50.0 {
        2
    } else if fval < 500.0 {
        1
    } else {
        0
    };
    ndec.min(7) as usize
}

/// Drop trailing zeros after a decimal point, and the point itself when
/// nothing follows it.
fn strip_trailing_zeros(text: &mut String) {
    if !text.contains('.') {
        return;
    }
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
}

/// `printf("%.{precision}e")`: at least two exponent digits, always signed.
fn c_exponential(value: f64, precision: usize) -> String {
    let raw = format!("{:.*e}", precision, value);
    match raw.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        }
        None => raw,
    }
}

/// `printf("%.{precision}g")`.
fn c_general(value: f64, precision: usize) -> String {
    let precision = precision.max(1);
    if value == 0.0 {
        return "0".to_string();
    }

    let probe = format!("{:.*e}", precision - 1, value);
    let exponent: i32 = probe
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let mut text = c_exponential(value, precision - 1);
        if let Some(pos) = text.find('e') {
            let (mantissa, tail) = text.split_at(pos);
            let mut mantissa = mantissa.to_string();
            strip_trailing_zeros(&mut mantissa);
            text = format!("{}{}", mantissa, tail);
        }
        text
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        let mut text = format!("{:.*}", decimals, value);
        strip_trailing_zeros(&mut text);
        text
    }
}
