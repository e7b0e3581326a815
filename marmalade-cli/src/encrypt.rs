// Copyright 2026 Marmalade Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! age encryption of the backup input.

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Encrypts `input` to the X25519 `recipient` (an `age1...` string),
/// writing `<name>.age` into `working_dir`. Returns the ciphertext path.
pub fn encrypt_file(recipient: &str, input: &Path, working_dir: &Path) -> Result<PathBuf> {
    let recipient: age::x25519::Recipient = recipient
        .parse()
        .map_err(|e| anyhow!("parse age recipient: {e}"))?;

    let file_name = input
        .file_name()
        .ok_or_else(|| anyhow!("no file name in {}", input.display()))?;
    let output_path = working_dir.join(format!("{}.age", file_name.to_string_lossy()));

    let mut source =
        File::open(input).with_context(|| format!("open {}", input.display()))?;
    let output =
        File::create(&output_path).with_context(|| format!("create {}", output_path.display()))?;

    let encryptor =
        age::Encryptor::with_recipients(vec![Box::new(recipient) as Box<dyn age::Recipient + Send>])
            .ok_or_else(|| anyhow!("no age recipients"))?;
    let mut writer = encryptor.wrap_output(output).context("age encrypt")?;
    io::copy(&mut source, &mut writer).context("copy to age")?;
    writer.finish().context("close encrypted file")?;

    Ok(output_path)
}
