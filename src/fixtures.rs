//! Shared builders for unit tests

use crate::catalog::Catalog;
use crate::db::Database;
use crate::types::{NewBranch, NewNote, NewSubject};

pub fn seed_branch(db: &Database, name: &str, code: &str) -> String {
    Catalog::new(db)
        .add_branch(&NewBranch {
            name: name.to_string(),
            code: code.to_string(),
            description: None,
        })
        .unwrap()
}

/// One "Computer Science" branch holding one "Data Structures" subject
pub fn seed_subject(db: &Database) -> (String, String) {
    let branch = seed_branch(db, "Computer Science", "CSE");
    let mut subject = subject_in(&branch, "Data Structures", 2, 3);
    subject.code = Some("CS201".to_string());
    let subject = Catalog::new(db).add_subject(&subject).unwrap();
    (branch, subject)
}

pub fn subject_in(branch: &str, name: &str, year: u32, semester: u32) -> NewSubject {
    NewSubject {
        name: name.to_string(),
        code: None,
        branch: branch.to_string(),
        year,
        semester,
        description: None,
    }
}

pub fn note_in(subject: &str, title: &str, is_published: bool) -> NewNote {
    NewNote {
        subject_id: subject.to_string(),
        title: title.to_string(),
        description: None,
        unit: None,
        pdf_url: format!(
            "https://res.cloudinary.com/demo/raw/upload/v1/notes/{}.pdf",
            title.to_lowercase().replace(' ', "-")
        ),
        is_published,
    }
}
