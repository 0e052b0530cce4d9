//! Host-service (SVC) dispatch: terminal output, CC/register dumps, sleep,
//! and host-file open/close/read/write. The SVC number is `R1*16 + R2`,
//! i.e. the two nibbles that follow the opcode byte in the RR encoding.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::time::Duration;

use log::{debug, warn};

use crate::condition_code::ConditionCode;
use crate::ebcdic;
use crate::error::{EngineError, EngineResult};
use crate::memory::Memory;
use crate::registers::Registers;

/// A side-effect produced by an SVC that the caller (headless runner or
/// debugger) may want to surface, rather than the engine writing straight
/// to stdout itself.
#[derive(Debug, Clone)]
pub enum SvcOutput {
    Terminal(String),
    RegisterDump(String),
    ConditionCodeDump(String),
}

/// Owns open host file handles across the lifetime of a run. Handles are
/// named by the two-digit number supplied in R1's high byte, matching the
/// reference's `'fh' + file_handle_num` dictionary keys.
pub struct SvcHost {
    files: HashMap<String, File>,
    /// Real sleeping is skipped; tests and headless runs would otherwise
    /// block on SVC 250. The requested duration is still recorded so a
    /// caller that wants real sleeping (the interactive debugger) can use it.
    pub last_sleep: Option<Duration>,
}

impl SvcHost {
    pub fn new() -> Self {
        SvcHost {
            files: HashMap::new(),
            last_sleep: None,
        }
    }

    fn read_filename(memory: &Memory, addr: usize, len: usize) -> EngineResult<String> {
        let ebcdic_bytes = memory.read(addr, len)?;
        let ascii = ebcdic::decode(ebcdic_bytes);
        Ok(String::from_utf8_lossy(&ascii).into_owned())
    }

    /// Dispatches SVC number `svc_num`, reading/writing registers and
    /// memory as each service requires. Returns any output the caller
    /// should render; never fails the run -- anomalies are reported
    /// through R15 exactly as the reference does.
    pub fn dispatch(
        &mut self,
        svc_num: u8,
        regs: &mut Registers,
        memory: &mut Memory,
        cc: ConditionCode,
    ) -> EngineResult<Option<SvcOutput>> {
        debug!("SVC {}", svc_num);
        match svc_num {
            255 => {
                let addr = regs.as_int(0).max(0) as usize;
                let len = regs.as_int(1).max(0) as usize;
                let ebcdic_bytes = memory.read(addr, len)?;
                let ascii = ebcdic::decode(ebcdic_bytes);
                Ok(Some(SvcOutput::Terminal(
                    String::from_utf8_lossy(&ascii).into_owned(),
                )))
            }
            254 => Ok(Some(SvcOutput::Terminal(regs.as_int(0).to_string()))),
            253 => Ok(Some(SvcOutput::Terminal(regs.as_hex(0)))),
            252 => Ok(Some(SvcOutput::ConditionCodeDump(
                cc.as_display().to_string(),
            ))),
            251 => {
                let dump = regs
                    .iter()
                    .map(|(r, v)| format!("R{:<2} = {:08X}", r, v))
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(Some(SvcOutput::RegisterDump(dump)))
            }
            250 => {
                let ms = regs.as_int(0).max(0) as u64;
                self.last_sleep = Some(Duration::from_millis(ms));
                Ok(None)
            }
            249 => {
                let addr = regs.as_int(0).max(0) as usize;
                let r1_hex = regs.as_hex(1);
                let handle_num = &r1_hex[0..2];
                let rw_indicator = &r1_hex[2..4];
                let mode = match rw_indicator {
                    "00" => "r",
                    "01" => "w",
                    _ => {
                        warn!("SVC 249: invalid r/w indicator {}", rw_indicator);
                        regs.set_int(15, 1);
                        return Ok(None);
                    }
                };
                if handle_num.parse::<u32>().is_err() {
                    warn!("SVC 249: invalid file handle number {}", handle_num);
                    regs.set_int(15, 2);
                    return Ok(None);
                }
                let filename_len = u16::from_str_radix(&r1_hex[4..8], 16).unwrap_or(0) as usize;
                let filename = Self::read_filename(memory, addr, filename_len)?;
                let opened = if mode == "r" {
                    File::open(&filename)
                } else {
                    File::create(&filename)
                };
                match opened {
                    Ok(file) => {
                        self.files.insert(handle_num.to_string(), file);
                        regs.set_int(15, 0);
                    }
                    Err(_) => {
                        warn!("SVC 249: could not open {}", filename);
                        regs.set_int(15, 3);
                    }
                }
                Ok(None)
            }
            248 => {
                let r1_hex = regs.as_hex(1);
                let handle_num = &r1_hex[0..2];
                if handle_num.parse::<u32>().is_err() {
                    regs.set_int(15, 1);
                    return Ok(None);
                }
                if self.files.remove(handle_num).is_some() {
                    regs.set_int(15, 0);
                } else {
                    warn!("SVC 248: unknown file handle {}", handle_num);
                    regs.set_int(15, 2);
                }
                Ok(None)
            }
            247 => {
                let r1_hex = regs.as_hex(1);
                let handle_num = &r1_hex[0..2];
                if handle_num.parse::<u32>().is_err() {
                    regs.set_int(15, 1);
                    return Ok(None);
                }
                let Some(file) = self.files.get(handle_num) else {
                    warn!("SVC 247: unknown file handle {}", handle_num);
                    regs.set_int(15, -1);
                    return Ok(None);
                };
                let mut reader = BufReader::new(file);
                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) => {
                        regs.set_int(15, 0);
                    }
                    Ok(_) => {
                        let line = line.trim_end_matches('\n').trim_end_matches('\r');
                        let reclen = line.len();
                        regs.set_int(15, reclen as i32);
                        if reclen > 0 {
                            let addr = regs.as_int(0).max(0) as usize;
                            let ebcdic_bytes = ebcdic::encode(line.as_bytes());
                            memory.write(addr, &ebcdic_bytes)?;
                        }
                    }
                    Err(_) => {
                        regs.set_int(15, -1);
                    }
                }
                Ok(None)
            }
            246 => {
                let addr = regs.as_int(0).max(0) as usize;
                let r1_hex = regs.as_hex(1);
                let handle_num = &r1_hex[0..2];
                let len = u16::from_str_radix(&r1_hex[4..8], 16).unwrap_or(0) as usize;
                if handle_num.parse::<u32>().is_err() {
                    regs.set_int(15, 1);
                    return Ok(None);
                }
                let Some(file) = self.files.get_mut(handle_num) else {
                    regs.set_int(15, 1);
                    return Ok(None);
                };
                let ebcdic_bytes = memory.read(addr, len)?;
                let ascii = ebcdic::decode(ebcdic_bytes);
                let write_result = file
                    .write_all(&ascii)
                    .and_then(|_| file.write_all(b"\n"));
                match write_result {
                    Ok(()) => regs.set_int(15, 0),
                    Err(_) => regs.set_int(15, 2),
                }
                Ok(None)
            }
            other => Err(EngineError::UnknownSvc(other)),
        }
    }
}

impl Default for SvcHost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::condition_code::ConditionCode;

    #[test]
    fn svc_255_reads_ebcdic_text_as_ascii() {
        let mut regs = Registers::new();
        let mut memory = Memory::new(16);
        // EBCDIC for "AB"
        memory.write(0, &[0xC1, 0xC2]).unwrap();
        regs.set_int(0, 0);
        regs.set_int(1, 2);
        let mut svc = SvcHost::new();
        let out = svc
            .dispatch(255, &mut regs, &mut memory, ConditionCode::Cc0)
            .unwrap();
        match out {
            Some(SvcOutput::Terminal(text)) => assert_eq!(text, "AB"),
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[test]
    fn svc_249_rejects_bad_rw_indicator() {
        let mut regs = Registers::new();
        let mut memory = Memory::new(16);
        regs.set_int(1, 0x0002_0000_u32 as i32); // handle "00", rw "02" (invalid)
        let mut svc = SvcHost::new();
        svc.dispatch(249, &mut regs, &mut memory, ConditionCode::Cc0)
            .unwrap();
        assert_eq!(regs.as_int(15), 1);
    }
}
