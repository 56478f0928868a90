use std::env;
use std::process;

use xydata_reader::{export_file, formats, load_file, ExportOptions};

fn print_usage(program: &str) {
    println!("Usage:");
    println!("    {} [-m] [-t FORMAT] INPUT_FILE OUTPUT_FILE", program);
    println!("    {} -l", program);
    println!();
    println!("  Converts INPUT_FILE to plain text OUTPUT_FILE");
    println!("  -l              list all supported formats");
    println!("  -m              also write metadata");
    println!("  -t FORMAT       format of the input file");
}

fn list_formats() {
    for info in formats() {
        println!("{:<20}: {}", info.name, info.description);
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("xyconv");

    if args.len() == 2 && args[1] == "-l" {
        list_formats();
        return;
    }
    if args.len() == 2 && (args[1] == "-h" || args[1] == "--help") {
        print_usage(program);
        return;
    }
    if args.len() < 3 {
        print_usage(program);
        process::exit(1);
    }

    // The last two arguments are the input and output paths.
    let (flags, paths) = args[1..].split_at(args.len() - 3);
    let mut with_meta = false;
    let mut format: Option<&str> = None;
    let mut i = 0;
    while i < flags.len() {
        match flags[i].as_str() {
            "-m" => with_meta = true,
            "-t" if i + 1 < flags.len() => {
                i += 1;
                format = Some(flags[i].as_str());
            }
            _ => {
                print_usage(program);
                process::exit(1);
            }
        }
        i += 1;
    }

    let (input, output) = (&paths[0], &paths[1]);
    let dataset = match load_file(input, format, &[]) {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("ERROR: Failed to read {}", input);
            eprintln!("  {}", e);
            process::exit(1);
        }
    };

    let opts = ExportOptions {
        with_meta,
        ..ExportOptions::default()
    };
    if let Err(e) = export_file(&dataset, output, &opts) {
        eprintln!("ERROR: Failed to write {}", output);
        eprintln!("  {}", e);
        process::exit(1);
    }
}
