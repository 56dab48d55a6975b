//! Human-readable rendering of a crash file.

use std::fmt::Write as _;

use chrono::DateTime;
use cinder_core::format::ExceptionStreamRecord;
use cinder_core::reader::{CrashInfo, MemoryRange, ModuleView};
use cinder_core::{CinderResult, DumpReader, StreamType};

/// Render everything the reader can decode
pub fn render(reader: &DumpReader<'_>) -> CinderResult<String>
{
    let mut out = String::new();
    let header = reader.header();
    let timestamp = DateTime::from_timestamp(i64::from(header.time_date_stamp), 0)
        .map_or_else(|| header.time_date_stamp.to_string(), |t| t.to_rfc3339());

    let _ = writeln!(out, "Header:");
    let _ = writeln!(out, "  Version: 0x{:08x}", header.version);
    let _ = writeln!(out, "  Streams: {}", header.number_of_streams);
    let _ = writeln!(out, "  Timestamp: {timestamp}");
    let _ = writeln!(out, "  Flags: 0x{:016x}", header.flags);

    let _ = writeln!(out, "\nDirectory:");
    for (i, entry) in reader.directory().iter().enumerate() {
        let _ = writeln!(out, "  [{i}] {:<28} {}", StreamType::new(entry.stream_type).to_string(), entry.location);
    }

    if let Some(info) = reader.crash_info()? {
        render_crash_info(&mut out, &info);
    }
    let modules = reader.modules()?;
    if !modules.is_empty() {
        render_modules(&mut out, &modules);
    }
    let ranges = reader.memory_ranges()?;
    if !ranges.is_empty() {
        render_memory(&mut out, &ranges);
    }
    if let Some(exception) = reader.exception()? {
        render_exception(&mut out, &exception);
    }

    for entry in reader.directory() {
        let stream_type = StreamType::new(entry.stream_type);
        if stream_type.name().is_none() {
            let _ = writeln!(out, "\nUser stream {stream_type}: {} bytes", entry.location.size);
        }
    }
    Ok(out)
}

fn render_crash_info(out: &mut String, info: &CrashInfo)
{
    let _ = writeln!(out, "\nCrash info:");
    let _ = writeln!(out, "  Report ID: {}", hex(&info.record.report_id));
    let _ = writeln!(out, "  Client ID: {}", hex(&info.record.client_id));
    for (key, value) in &info.simple_annotations {
        let _ = writeln!(out, "  {key} = {value}");
    }
    for module in &info.modules {
        let _ = writeln!(out, "  Module #{}:", module.module_list_index);
        for line in &module.list_annotations {
            let _ = writeln!(out, "    - {line}");
        }
        for (key, value) in &module.simple_annotations {
            let _ = writeln!(out, "    {key} = {value}");
        }
    }
}

fn render_modules(out: &mut String, modules: &[ModuleView])
{
    let _ = writeln!(out, "\nModules:");
    for module in modules {
        let start = module.record.base_of_image;
        let end = start + u64::from(module.record.size_of_image);
        let _ = write!(out, "  0x{start:016x}-0x{end:016x} {}", module.name);
        if let Some(codeview) = &module.codeview {
            let _ = write!(out, " ({} {}{:x})", codeview.pdb_path, hex(&codeview.guid), codeview.age);
        }
        out.push('\n');
    }
}

fn render_memory(out: &mut String, ranges: &[MemoryRange<'_>])
{
    let _ = writeln!(out, "\nMemory:");
    for range in ranges {
        let _ = writeln!(out, "  0x{:016x} {} bytes at {}", range.base_address, range.bytes.len(), range.location);
    }
}

fn render_exception(out: &mut String, exception: &ExceptionStreamRecord)
{
    let record = &exception.exception_record;
    let _ = writeln!(out, "\nException:");
    let _ = writeln!(out, "  Thread: {}", exception.thread_id);
    let _ = writeln!(out, "  Code: 0x{:08x}", record.exception_code);
    let _ = writeln!(out, "  Flags: 0x{:08x}", record.exception_flags);
    let _ = writeln!(out, "  Address: 0x{:016x}", record.exception_address);
    let count = (record.number_parameters as usize).min(record.exception_information.len());
    for (i, parameter) in record.exception_information[..count].iter().enumerate() {
        let _ = writeln!(out, "  Parameter[{i}]: 0x{parameter:016x}");
    }
    let _ = writeln!(out, "  Context: {}", exception.thread_context);
}

fn hex(bytes: &[u8]) -> String
{
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::dump::{build_dump, DumpContents};

    #[test]
    fn test_render_lists_streams_and_annotations()
    {
        let contents = DumpContents {
            annotations: vec![("channel".to_string(), "beta".to_string())],
            modules: vec!["app@0x400000:0x2000".parse().unwrap()],
            request: None,
            timestamp: 0,
        };
        let mut root = build_dump(&contents).unwrap();
        let mut bytes = Vec::new();
        root.write_everything(&mut bytes).unwrap();

        let text = render(&DumpReader::parse(&bytes).unwrap()).unwrap();
        assert!(text.contains("CrashInfo (0x43500001)"));
        assert!(text.contains("channel = beta"));
        assert!(text.contains("0x0000000000400000-0x0000000000402000 app"));
        assert!(text.contains("User stream 0x00010000"));
        assert!(text.contains("1970-01-01T00:00:00+00:00"));
    }

    #[test]
    fn test_hex()
    {
        assert_eq!(hex(&[0x00, 0xab, 0x10]), "00ab10");
    }
}
