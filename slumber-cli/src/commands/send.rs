//! `slumber send` and `slumber foot-unlock`: one-off control messages.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};

use slumber_core::{Config, ControlMessage, OscValue};
use slumber_osc::OscSender;
use slumber_sync::foot_anchor::foot_lock_unlock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValueType {
    Bool,
    Int,
    Float,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// OSC address, e.g. /avatar/parameters/Oyasumi/SleepMode.
    pub address: String,

    /// Value to send.
    pub value: String,

    /// Value type; inferred from the value when omitted.
    #[arg(long = "type", value_enum)]
    pub kind: Option<ValueType>,
}

impl SendArgs {
    pub fn run(self, config: Config) -> Result<()> {
        validate_address(&self.address)?;
        let value = parse_value(&self.value, self.kind)?;
        let target = config.osc.target_addr()?;
        let message = ControlMessage::new(self.address, vec![value]);

        crate::runtime()?.block_on(async {
            let sender = bind_sender(target).await?;
            sender
                .send_to(target, &message)
                .with_context(|| format!("failed to send to {target}"))
        })?;
        println!("sent {} {} to {target}", message.address, message.values[0]);
        Ok(())
    }
}

pub fn foot_unlock(config: Config) -> Result<()> {
    let target = config.osc.target_addr()?;
    crate::runtime()?.block_on(async {
        let sender = bind_sender(target).await?;
        foot_lock_unlock(&sender.to(target))
            .await
            .with_context(|| format!("failed to send foot-anchor release to {target}"))
    })?;
    println!("foot lock released");
    Ok(())
}

async fn bind_sender(target: SocketAddr) -> Result<OscSender> {
    let local = match target {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    };
    let (sender, _receiver) = slumber_osc::bind(local)
        .await
        .context("failed to open UDP socket")?;
    Ok(sender)
}

fn validate_address(address: &str) -> Result<()> {
    if !address.starts_with('/') || address.len() < 2 {
        bail!("address '{address}' must start with '/'");
    }
    if address.chars().any(|c| c.is_whitespace() || c == '#') {
        bail!("address '{address}' must not contain whitespace or '#'");
    }
    Ok(())
}

fn parse_value(raw: &str, kind: Option<ValueType>) -> Result<OscValue> {
    let kind = match kind {
        Some(kind) => kind,
        None if raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("false") => {
            ValueType::Bool
        }
        None if raw.parse::<i32>().is_ok() => ValueType::Int,
        None => ValueType::Float,
    };

    let value = match kind {
        ValueType::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => OscValue::Bool(true),
            "false" | "0" => OscValue::Bool(false),
            _ => bail!("'{raw}' is not a bool"),
        },
        ValueType::Int => OscValue::Int(
            raw.parse()
                .with_context(|| format!("'{raw}' is not a 32-bit integer"))?,
        ),
        ValueType::Float => OscValue::Float(
            raw.parse()
                .with_context(|| format!("'{raw}' is not a number"))?,
        ),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_is_inferred() {
        assert_eq!(parse_value("TRUE", None).unwrap(), OscValue::Bool(true));
        assert_eq!(parse_value("4", None).unwrap(), OscValue::Int(4));
        assert_eq!(parse_value("0.5", None).unwrap(), OscValue::Float(0.5));
        assert!(parse_value("sleepy", None).is_err());
    }

    #[test]
    fn explicit_type_wins() {
        assert_eq!(
            parse_value("1", Some(ValueType::Bool)).unwrap(),
            OscValue::Bool(true)
        );
        assert_eq!(
            parse_value("3", Some(ValueType::Float)).unwrap(),
            OscValue::Float(3.0)
        );
        assert!(parse_value("2.5", Some(ValueType::Int)).is_err());
    }

    #[test]
    fn addresses_are_checked() {
        assert!(validate_address("/avatar/parameters/VRCFootAnchor").is_ok());
        assert!(validate_address("avatar").is_err());
        assert!(validate_address("/").is_err());
        assert!(validate_address("/with space").is_err());
    }
}
