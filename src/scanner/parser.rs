//! Nmap XML parser - turns `nmap -oX -` output into a [`ScanReport`]

use super::{HostScan, OsClass, PortInfo, ScanReport};
use crate::{Result, ScanError};
use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

/// Parse a complete nmap XML document
pub fn parse_nmap_xml(xml: &str) -> Result<ScanReport> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut builder = ReportBuilder::default();

    loop {
        let event = reader.read_event().map_err(|e| {
            ScanError::ParseError(format!(
                "Malformed nmap XML at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(ref e) => builder.open(e, false)?,
            Event::Empty(ref e) => builder.open(e, true)?,
            Event::End(ref e) => builder.close(e.name().as_ref()),
            Event::Text(ref e) => {
                if builder.in_cpe {
                    let text = e.unescape()?;
                    builder.cpe_text(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    builder.finish()
}

/// Element-by-element state while walking the document
#[derive(Default)]
struct ReportBuilder {
    report: ScanReport,
    saw_root: bool,
    closed_root: bool,
    host: Option<HostScan>,
    port: Option<PendingPort>,
    in_service: bool,
    in_cpe: bool,
    run_error: Option<String>,
}

struct PendingPort {
    protocol: String,
    port: u16,
    info: PortInfo,
}

impl ReportBuilder {
    fn open(&mut self, e: &BytesStart, empty: bool) -> Result<()> {
        match e.name().as_ref() {
            b"nmaprun" => {
                self.saw_root = true;
                self.closed_root = empty;
                let attrs = attributes(e)?;
                self.report.command_line = attrs.get("args").cloned().unwrap_or_default();
            }
            b"host" if !empty => {
                self.host = Some(HostScan::default());
            }
            b"address" => {
                if let Some(host) = self.host.as_mut() {
                    let attrs = attributes(e)?;
                    let addrtype = attrs.get("addrtype").map(String::as_str).unwrap_or("ipv4");
                    if addrtype == "ipv4" || addrtype == "ipv6" {
                        host.address = attrs.get("addr").cloned().unwrap_or_default();
                    }
                }
            }
            b"hostname" => {
                if let Some(host) = self.host.as_mut() {
                    if let Some(name) = attributes(e)?.remove("name") {
                        host.hostnames.push(name);
                    }
                }
            }
            b"status" => {
                if let Some(host) = self.host.as_mut() {
                    host.status = attributes(e)?.remove("state").unwrap_or_default();
                }
            }
            b"port" if self.host.is_some() => {
                let mut attrs = attributes(e)?;
                let portid = attrs.remove("portid").unwrap_or_default();
                let port = portid
                    .parse::<u16>()
                    .map_err(|_| ScanError::ParseError(format!("Invalid portid: {:?}", portid)))?;
                self.port = Some(PendingPort {
                    protocol: attrs.remove("protocol").unwrap_or_else(|| "tcp".to_string()),
                    port,
                    info: PortInfo::default(),
                });
                if empty {
                    self.commit_port();
                }
            }
            b"state" => {
                if let Some(pending) = self.port.as_mut() {
                    let mut attrs = attributes(e)?;
                    pending.info.state = attrs.remove("state").unwrap_or_default();
                    pending.info.reason = attrs.remove("reason").unwrap_or_default();
                }
            }
            b"service" => {
                if let Some(pending) = self.port.as_mut() {
                    let mut attrs = attributes(e)?;
                    let info = &mut pending.info;
                    info.name = attrs.remove("name").unwrap_or_default();
                    info.product = attrs.remove("product").unwrap_or_default();
                    info.version = attrs.remove("version").unwrap_or_default();
                    info.extrainfo = attrs.remove("extrainfo").unwrap_or_default();
                    info.conf = attrs.remove("conf").unwrap_or_default();
                    self.in_service = !empty;
                }
            }
            b"cpe" if !empty => {
                self.in_cpe = self.in_service && self.port.is_some();
            }
            b"osclass" => {
                if let Some(host) = self.host.as_mut() {
                    let mut attrs = attributes(e)?;
                    host.osclass.push(OsClass {
                        kind: attrs.remove("type").unwrap_or_default(),
                        vendor: attrs.remove("vendor").unwrap_or_default(),
                        osfamily: attrs.remove("osfamily").unwrap_or_default(),
                        osgen: attrs.remove("osgen").unwrap_or_default(),
                        accuracy: attrs
                            .get("accuracy")
                            .and_then(|a| a.parse().ok())
                            .unwrap_or(0),
                    });
                }
            }
            b"finished" => {
                let mut attrs = attributes(e)?;
                if attrs.get("exit").map(String::as_str) == Some("error") {
                    self.run_error = Some(
                        attrs
                            .remove("errormsg")
                            .unwrap_or_else(|| "nmap reported an error".to_string()),
                    );
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"host" => {
                if let Some(host) = self.host.take() {
                    debug!(
                        "Parsed host {} ({} tcp, {} udp, {} osclass)",
                        host.address,
                        host.tcp.len(),
                        host.udp.len(),
                        host.osclass.len()
                    );
                    self.report.hosts.insert(host.address.clone(), host);
                }
            }
            b"nmaprun" => self.closed_root = true,
            b"port" => self.commit_port(),
            b"service" => self.in_service = false,
            b"cpe" => self.in_cpe = false,
            _ => {}
        }
    }

    fn cpe_text(&mut self, text: &str) {
        if let Some(pending) = self.port.as_mut() {
            if pending.info.cpe.is_empty() {
                pending.info.cpe = text.to_string();
            }
        }
    }

    fn commit_port(&mut self) {
        let (Some(pending), Some(host)) = (self.port.take(), self.host.as_mut()) else {
            return;
        };
        match pending.protocol.as_str() {
            "tcp" => {
                host.tcp.insert(pending.port, pending.info);
            }
            "udp" => {
                host.udp.insert(pending.port, pending.info);
            }
            other => debug!("Skipping {}/{} entry", pending.port, other),
        }
        self.in_service = false;
        self.in_cpe = false;
    }

    fn finish(self) -> Result<ScanReport> {
        if let Some(message) = self.run_error {
            return Err(ScanError::NmapFailed {
                status: None,
                stderr: message,
            });
        }
        if !self.saw_root {
            return Err(ScanError::ParseError(
                "No nmaprun element in scanner output".to_string(),
            ));
        }
        // nmap killed mid-run leaves the document open
        if !self.closed_root {
            return Err(ScanError::ParseError(
                "Truncated nmap XML: nmaprun element never closed".to_string(),
            ));
        }
        Ok(self.report)
    }
}

fn attributes(e: &BytesStart) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        map.insert(key, value);
    }
    Ok(map)
}
