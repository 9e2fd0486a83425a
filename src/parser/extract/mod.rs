pub mod age;
pub mod dates;
pub mod employment;
pub mod fees;
pub mod location;
pub mod qualification;
pub mod salary;
pub mod sections;
pub mod vacancies;

use crate::types::*;

/// Everything the extractors pulled out of one cleaned text. Each field is
/// independent; a miss in one extractor never affects another.
#[derive(Debug, Clone)]
pub struct ExtractedFields {
    pub vacancies: VacancyInfo,
    pub employment_type: EmploymentType,
    pub location: LocationInfo,
    pub qualification: QualificationInfo,
    pub age: AgeInfo,
    pub salary: SalaryInfo,
    pub application: ApplicationInfo,
    pub dates: DateInfo,
    pub sections: TextSections,
}

pub fn extract_all(text: &str, section_window: usize) -> ExtractedFields {
    ExtractedFields {
        vacancies: vacancies::extract(text),
        employment_type: employment::employment_type(text),
        location: location::extract(text),
        qualification: qualification::extract(text),
        age: age::extract(text),
        salary: salary::extract(text),
        application: ApplicationInfo {
            mode: employment::application_mode(text),
            fees: fees::extract(text),
        },
        dates: dates::extract(text),
        sections: sections::extract(text, section_window),
    }
}

// ── Tests ──
