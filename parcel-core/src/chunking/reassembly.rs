use super::splitter::part_name;

/// Human-readable recipe for joining parts back together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReassemblyInstructions {
    /// Artifact file name the parts were cut from, e.g. `report.pdf.zip`.
    pub artifact_name: String,
    pub total_parts: u32,
    pub encrypted: bool,
}

impl ReassemblyInstructions {
    pub fn new(artifact_name: impl Into<String>, total_parts: u32, encrypted: bool) -> Self {
        Self {
            artifact_name: artifact_name.into(),
            total_parts,
            encrypted,
        }
    }

    pub fn part_names(&self) -> Vec<String> {
        (1..=self.total_parts)
            .map(|i| part_name(&self.artifact_name, i, self.total_parts))
            .collect()
    }

    /// Markdown code block, sent as a plain message after the last part.
    pub fn render(&self) -> String {
        let name = &self.artifact_name;
        let parts = self.part_names().join(", ");
        let note = if self.encrypted {
            "The archive is encrypted. You'll need the password to extract it."
        } else {
            "The archive is not encrypted."
        };
        format!(
            "```\n\
             To reassemble the file:\n\
             1. Download all parts ({total} in total): {parts}\n\
             2. Use one of the following commands:\n   \
             # Windows\n   \
             copy /b {name}.* {name}\n\n   \
             # Linux/Mac\n   \
             cat {name}.* > {name}\n\
             3. Extract {name}\n\n\
             {note}\n\
             ```",
            total = self.total_parts,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_every_part_and_command() {
        let text = ReassemblyInstructions::new("movie.mkv.zip", 2, false).render();
        assert!(text.contains("movie.mkv.zip.001"));
        assert!(text.contains("movie.mkv.zip.002"));
        assert!(text.contains("2 in total"));
        assert!(text.contains("copy /b movie.mkv.zip.* movie.mkv.zip"));
        assert!(text.contains("cat movie.mkv.zip.* > movie.mkv.zip"));
        assert!(text.contains("not encrypted"));
        assert!(text.starts_with("```") && text.ends_with("```"));
    }

    #[test]
    fn mentions_password_when_encrypted() {
        let text = ReassemblyInstructions::new("a.zip", 3, true).render();
        assert!(text.contains("password"));
    }
}
