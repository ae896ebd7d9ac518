// Console session
// Prompts for p, q and m, saves the generated keys, and reports the round trip

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{info, warn};

use crate::rsa::{decode, encode, generate_keypair, RsaBigInt, RsaKeyPair};
use crate::util::file_ops::{save_keypair, KeyFileConfig};

/// Everything a finished session produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub keypair: RsaKeyPair,
    pub message: RsaBigInt,
    pub ciphertext: RsaBigInt,
    pub decoded: RsaBigInt,
}

impl SessionReport {
    pub fn succeeded(&self) -> bool {
        self.message == self.decoded
    }
}

/// One prompt/answer run over arbitrary input and output streams
pub struct Session<R, W> {
    input: R,
    output: W,
    config: KeyFileConfig,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(input: R, output: W, config: KeyFileConfig) -> Self {
        Self {
            input,
            output,
            config,
        }
    }

    pub fn run(&mut self) -> Result<SessionReport> {
        let p = self.prompt_number("p")?;
        let q = self.prompt_number("q")?;

        let keypair = generate_keypair(&p, &q).context("failed to generate keys")?;
        info!(n = %keypair.public_key.n(), e = %keypair.public_key.e(), "generated key pair");

        save_keypair(&self.config, &keypair).context("failed to save keys")?;
        writeln!(
            self.output,
            "Public key saved to {}",
            self.config.public_key_path.display()
        )?;
        writeln!(
            self.output,
            "Private key saved to {}",
            self.config.private_key_path.display()
        )?;

        let message = self.prompt_number("m")?;
        let ciphertext = encode(&keypair.public_key, &message).context("failed to encode m")?;
        writeln!(self.output, "Encoded number c: {}", ciphertext)?;

        let decoded = decode(&keypair.public_key, &keypair.private_key, &ciphertext)
            .context("failed to decode c")?;
        writeln!(self.output, "Decoded number m: {}", decoded)?;

        let report = SessionReport {
            keypair,
            message,
            ciphertext,
            decoded,
        };

        if report.succeeded() {
            writeln!(self.output, "Encoding/Decoding successful!")?;
        } else {
            writeln!(self.output, "Encoding/Decoding failed.")?;
        }
        self.output.flush()?;

        Ok(report)
    }

    fn prompt_number(&mut self, name: &str) -> Result<RsaBigInt> {
        write!(self.output, "Insert {}: ", name)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("input closed while waiting for {}", name);
        }

        let answer = line.trim();
        answer.parse().map_err(|err| {
            warn!(name, answer, "rejected non-numeric input");
            anyhow!("{} must be a non-negative integer, got `{}`: {}", name, answer, err)
        })
    }
}

/// Run a session on stdin/stdout
pub fn run_console(config: KeyFileConfig) -> Result<SessionReport> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    Session::new(stdin.lock(), stdout.lock(), config).run()
}
