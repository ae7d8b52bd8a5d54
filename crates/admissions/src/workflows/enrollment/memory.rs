use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    Course, Institute, Student, StudentDraft, StudentId, VerificationStatus,
};
use super::repository::{ReferenceCatalog, RepositoryError, StudentPredicate, StudentRepository};

/// Process-local student store with its reference catalog, used by the API service and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStudentStore {
    state: Arc<Mutex<StoreState>>,
}

#[derive(Debug, Default)]
struct StoreState {
    next_id: u64,
    students: BTreeMap<StudentId, Student>,
    institutes: HashMap<String, Institute>,
    courses: HashMap<String, Course>,
}

impl InMemoryStudentStore {
    pub fn with_reference_data(
        institutes: impl IntoIterator<Item = Institute>,
        courses: impl IntoIterator<Item = Course>,
    ) -> Self {
        let state = StoreState {
            institutes: institutes
                .into_iter()
                .map(|institute| (institute.code.clone(), institute))
                .collect(),
            courses: courses
                .into_iter()
                .map(|course| (course.code.clone(), course))
                .collect(),
            ..StoreState::default()
        };

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|state| state.students.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("student store mutex poisoned".to_string()))
    }
}

impl StudentRepository for InMemoryStudentStore {
    fn insert(&self, draft: StudentDraft) -> Result<Student, RepositoryError> {
        let mut state = self.lock()?;
        state.next_id += 1;
        let student = draft.into_student(StudentId(state.next_id));
        state.students.insert(student.id, student.clone());
        Ok(student)
    }

    fn replace(&self, current: &Student, next: Student) -> Result<Student, RepositoryError> {
        let mut state = self.lock()?;
        let slot = state
            .students
            .get_mut(&current.id)
            .ok_or(RepositoryError::NotFound)?;
        if slot != current {
            return Err(RepositoryError::Conflict(current.id));
        }

        *slot = next.clone();
        Ok(next)
    }

    fn transition_where(
        &self,
        predicates: &[StudentPredicate],
        status: VerificationStatus,
    ) -> Result<Vec<Student>, RepositoryError> {
        let mut state = self.lock()?;
        Ok(state
            .students
            .values_mut()
            .filter(|student| predicates.iter().all(|predicate| predicate.matches(student)))
            .map(|student| {
                student.verification_status = status;
                student.clone()
            })
            .collect())
    }

    fn fetch(&self, id: StudentId) -> Result<Option<Student>, RepositoryError> {
        Ok(self.lock()?.students.get(&id).cloned())
    }

    fn remove(&self, id: StudentId) -> Result<(), RepositoryError> {
        self.lock()?
            .students
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn find(&self, predicates: &[StudentPredicate]) -> Result<Vec<Student>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .students
            .values()
            .filter(|student| predicates.iter().all(|predicate| predicate.matches(student)))
            .cloned()
            .collect())
    }
}

impl ReferenceCatalog for InMemoryStudentStore {
    fn institute_by_code(&self, code: &str) -> Result<Option<Institute>, RepositoryError> {
        Ok(self.lock()?.institutes.get(code.trim()).cloned())
    }

    fn course_by_code(&self, code: &str) -> Result<Option<Course>, RepositoryError> {
        Ok(self.lock()?.courses.get(code.trim()).cloned())
    }
}
