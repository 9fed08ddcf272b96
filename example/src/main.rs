use std::fs::{self, File};
use std::io;

use asm8051::{AsmError, Assembler8051, AssemblerConfig};
use tracing::Level;

fn main() -> Result<(), AsmError> {
    // One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    let level = std::env::var("ASM8051_LOG")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    // Assemble a file if one is given, the built-in demo otherwise
    let source = match std::env::args().nth(1) {
        Some(path) => fs::read_to_string(path)?,
        None => DEMO.to_string(),
    };

    let mut assembler = Assembler8051::with_config(AssemblerConfig::new().hex_record_len(16))?;

    {
        let assembly = assembler.assemble(&source)?;
        assembly.print_listing();
        assembly.write_bin(File::create("test_output.bin")?)?;
        assembly.write_hex(File::create("test_output.hex")?)?;
        assembly.save_listing("listing.txt")?;
        println!("Machine code saved to test_output.bin");
        println!("Intel HEX saved to test_output.hex");
        println!("Listing saved to listing.txt");
        println!("Total bytes: {}", assembly.byte_count());
        tracing::info!("{} symbols defined", assembly.symbols.len());
    }

    {
        let hex = assembler.assemble_hex(&source)?;
        println!("\n{}", hex);
    }

    Ok(())
}

// Demo program for the DSM-51 board (synthetic coverage of modes; not
// necessarily meaningful at runtime)
const DEMO: &str = r#"
; *** Constants ***
COUNT   EQU 10
LED     EQU P1.7
BUFFER  EQU 30H

        ORG 0
        LJMP MAIN

; *** Serial interrupt vector ***
        ORG 23H
        CLR  TI
        CLR  RI
        RETI

        ORG 100H
MAIN:   MOV  SP, #5FH
        MOV  DPTR, #TEXT
        LCALL LCD_CLR
        LCALL WRITE_TEXT

; *** Data transfer ***
transfer:
        MOV  A, #0x25
        MOV  R0, #BUFFER
        MOV  @R0, A
        MOV  31H, BUFFER
        MOV  R7, 31H
        MOVX @DPTR, A
        MOVX A, @R1
        MOVC A, @A+DPTR
        PUSH ACC
        POP  B
        XCH  A, R3
        XCHD A, @R0

; *** Arithmetic ***
arith:  ADD  A, #'0'
        ADDC A, R2
        SUBB A, @R1
        INC  DPTR
        DEC  BUFFER
        MUL  AB
        DIV  AB
        DA   A

; *** Logic and bits ***
logic:  ANL  A, #0FH
        ORL  P1, #11110000B
        XRL  A, BUFFER
        SETB LED
        CPL  P1.0
        ANL  C, /ACC.0
        MOV  C, TI
        MOV  PSW.3, C
        RL   A
        RRC  A
        SWAP A

; *** Loops and branches ***
        MOV  R1, #COUNT
loop:   DJNZ R1, loop
        CJNE A, #',', skip
        JNB  RI, $
skip:   JZ   done
        ACALL helper
        AJMP done

helper: NOP
        RET

done:   SJMP $

TEXT:   NOP
"#;
