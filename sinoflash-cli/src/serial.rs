//! Interactive serial port selection.
//!
//! Resolution order:
//! - explicit `--port` / `SINOFLASH_PORT`
//! - `[connection] serial` from the config file
//! - the single detected candidate (known programmers first)
//! - an interactive prompt, unless running non-interactively

use {
    crate::{CliError, config::Config},
    anyhow::Result,
    console::style,
    dialoguer::{Confirm, Error as DialoguerError, Select, theme::ColorfulTheme},
    log::{debug, info},
    sinoflash::{DetectedPort, detect_ports},
    std::io::IsTerminal,
};

/// Options for serial port selection.
#[derive(Debug, Clone, Default)]
pub struct SerialOptions {
    /// Explicit port specified via CLI.
    pub port: Option<String>,
    /// Non-interactive mode (fail if the choice is ambiguous).
    pub non_interactive: bool,
}

/// Result of port selection.
pub struct SelectedPort {
    /// The selected port info.
    pub port: DetectedPort,
    /// Whether this port is a recognized programmer board or bridge.
    pub is_known: bool,
}

impl SelectedPort {
    fn new(port: DetectedPort) -> Self {
        let is_known = port.is_likely_programmer();
        Self { port, is_known }
    }
}

fn usage_err(message: &str) -> anyhow::Error {
    CliError::Usage(message.to_string()).into()
}

fn cancelled() -> anyhow::Error {
    CliError::Cancelled("Port selection cancelled".to_string()).into()
}

/// Known programmers if any, otherwise everything.
fn candidates(ports: Vec<DetectedPort>) -> Vec<DetectedPort> {
    let (known, other): (Vec<_>, Vec<_>) = ports
        .into_iter()
        .partition(DetectedPort::is_likely_programmer);
    if known.is_empty() { other } else { known }
}

fn select_non_interactive_port(mut ports: Vec<DetectedPort>) -> Result<SelectedPort> {
    match ports.len() {
        1 => Ok(SelectedPort::new(ports.remove(0))),
        0 => Err(usage_err(
            "No serial port available; pass --port or set SINOFLASH_PORT",
        )),
        n => Err(usage_err(&format!(
            "{n} candidate ports found; pass --port to choose one"
        ))),
    }
}

/// Select a serial port interactively or automatically.
pub fn select_serial_port(options: &SerialOptions, config: &Config) -> Result<SelectedPort> {
    if let Some(port_name) = &options.port {
        return Ok(find_port_by_name(port_name));
    }

    if let Some(port_name) = &config.connection.serial {
        debug!("Using port from config: {port_name}");
        return Ok(find_port_by_name(port_name));
    }

    let ports = detect_ports();
    if ports.is_empty() {
        return Err(usage_err("No serial ports found"));
    }
    let mut ports = candidates(ports);

    if options.non_interactive {
        return select_non_interactive_port(ports);
    }

    if ports.len() == 1 {
        let selected = SelectedPort::new(ports.remove(0));
        if selected.is_known {
            info!(
                "Auto-selected port: {} [{}]",
                selected.port.name,
                selected.port.device.name()
            );
            return Ok(selected);
        }
        ensure_interactive_terminal()?;
        return confirm_single_port(selected.port);
    }

    ensure_interactive_terminal()?;
    select_port_interactive(ports)
}

fn ensure_interactive_terminal() -> Result<()> {
    if std::io::stdin().is_terminal() && std::io::stderr().is_terminal() {
        Ok(())
    } else {
        Err(usage_err(
            "Port selection needs a terminal; pass --port or --non-interactive",
        ))
    }
}

fn map_prompt_error(err: DialoguerError) -> anyhow::Error {
    match err {
        DialoguerError::IO(io_err) => {
            if io_err.kind() == std::io::ErrorKind::Interrupted {
                cancelled()
            } else {
                usage_err(&format!("Prompt failed: {io_err}"))
            }
        },
    }
}

/// Find a port by name, keeping USB metadata when the OS reports the port.
fn find_port_by_name(name: &str) -> SelectedPort {
    let ports = detect_ports();
    let found = ports
        .iter()
        .find(|p| p.name == name)
        .or_else(|| ports.iter().find(|p| p.name.eq_ignore_ascii_case(name)));

    match found {
        Some(port) => SelectedPort::new(port.clone()),
        None => SelectedPort::new(DetectedPort::plain(name)),
    }
}

/// One prompt line per port.
fn port_label(port: &DetectedPort) -> String {
    let name = if port.is_likely_programmer() {
        style(&port.name).bold().to_string()
    } else {
        port.name.clone()
    };

    let device_info = if port.device.is_known() {
        format!(" [{}]", style(port.device.name()).yellow())
    } else if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
        format!(" ({vid:04X}:{pid:04X})")
    } else {
        String::new()
    };

    let product = port
        .product
        .as_ref()
        .map(|p| format!(" - {}", style(p).dim()))
        .unwrap_or_default();

    format!("{name}{device_info}{product}")
}

fn select_port_interactive(ports: Vec<DetectedPort>) -> Result<SelectedPort> {
    eprintln!(
        "{} Found {} serial port(s)",
        style("ℹ").blue(),
        ports.len()
    );

    let term_width = console::Term::stderr().size().1 as usize;
    let max_item_width = term_width.saturating_sub(4);
    let labels: Vec<String> = ports
        .iter()
        .map(|p| console::truncate_str(&port_label(p), max_item_width, "\u{2026}").into_owned())
        .collect();

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select the programmer port")
        .items(&labels)
        .default(0)
        .interact_opt()
        .map_err(map_prompt_error)?;

    match selection {
        Some(index) => ports
            .into_iter()
            .nth(index)
            .map(SelectedPort::new)
            .ok_or_else(|| anyhow::anyhow!("Invalid port index: {index}")),
        None => Err(cancelled()),
    }
}

/// Confirm use of a single unrecognized port.
fn confirm_single_port(port: DetectedPort) -> Result<SelectedPort> {
    let product_info = port
        .product
        .as_ref()
        .map(|p| format!(" - {p}"))
        .unwrap_or_default();

    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Use {}{product_info}?", port.name))
        .default(true)
        .interact_opt()
        .map_err(map_prompt_error)?
        .unwrap_or(false);

    if confirmed {
        Ok(SelectedPort::new(port))
    } else {
        Err(cancelled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sinoflash::DeviceKind;

    fn usb(name: &str, device: DeviceKind) -> DetectedPort {
        DetectedPort {
            device,
            vid: Some(0x2341),
            pid: Some(0x0043),
            product: Some("Uno".to_string()),
            ..DetectedPort::plain(name)
        }
    }

    fn assert_usage(result: Result<SelectedPort>) {
        let err = result.err().expect("expected error");
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::Usage(_))
        ));
    }

    #[test]
    fn test_serial_options_default() {
        let options = SerialOptions::default();
        assert!(options.port.is_none());
        assert!(!options.non_interactive);
    }

    #[test]
    fn test_explicit_port_wins_over_config() {
        let mut config = Config::default();
        config.connection.serial = Some("/dev/from-config".to_string());
        let options = SerialOptions {
            port: Some("/dev/explicit-port".to_string()),
            non_interactive: true,
        };
        let selected = select_serial_port(&options, &config).unwrap();
        assert_eq!(selected.port.name, "/dev/explicit-port");
    }

    #[test]
    fn test_config_port_used_without_flag() {
        let mut config = Config::default();
        config.connection.serial = Some("/dev/from-config".to_string());
        let options = SerialOptions {
            non_interactive: true,
            ..Default::default()
        };
        let selected = select_serial_port(&options, &config).unwrap();
        assert_eq!(selected.port.name, "/dev/from-config");
    }

    #[test]
    fn test_unlisted_port_gets_placeholder() {
        let selected = find_port_by_name("/dev/does-not-exist-42");
        assert_eq!(selected.port.name, "/dev/does-not-exist-42");
        assert_eq!(selected.port.device, DeviceKind::Unknown);
        assert!(!selected.is_known);
    }

    #[test]
    fn test_candidates_prefer_known_devices() {
        let ports = vec![
            DetectedPort::plain("/dev/ttyS0"),
            usb("/dev/ttyACM0", DeviceKind::Arduino),
        ];
        let picked = candidates(ports);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "/dev/ttyACM0");
    }

    #[test]
    fn test_candidates_fall_back_to_all() {
        let ports = vec![
            DetectedPort::plain("/dev/ttyS0"),
            DetectedPort::plain("/dev/ttyS1"),
        ];
        assert_eq!(candidates(ports).len(), 2);
    }

    #[test]
    fn test_select_non_interactive_multiple_ports_returns_usage_error() {
        let ports = vec![
            DetectedPort::plain("/dev/ttyUSB0"),
            DetectedPort::plain("/dev/ttyUSB1"),
        ];
        assert_usage(select_non_interactive_port(ports));
    }

    #[test]
    fn test_select_non_interactive_no_ports_returns_usage_error() {
        assert_usage(select_non_interactive_port(vec![]));
    }

    #[test]
    fn test_select_non_interactive_single_port_returns_selected_port() {
        let ports = vec![usb("/dev/ttyACM0", DeviceKind::Arduino)];
        let selected = select_non_interactive_port(ports).unwrap();
        assert_eq!(selected.port.name, "/dev/ttyACM0");
        assert!(selected.is_known);
    }

    #[test]
    fn test_port_label_includes_device_and_product() {
        console::set_colors_enabled(false);
        let label = port_label(&usb("/dev/ttyACM0", DeviceKind::Arduino));
        assert!(label.starts_with("/dev/ttyACM0"));
        assert!(label.contains("Arduino"));
        assert!(label.contains("Uno"));
    }

    #[test]
    fn test_port_label_unknown_shows_vid_pid() {
        console::set_colors_enabled(false);
        let label = port_label(&usb("/dev/ttyUSB3", DeviceKind::Unknown));
        assert!(label.contains("(2341:0043)"));
    }
}
