use crate::question::Question;
use rand::seq::SliceRandom;
use rand::Rng;

/// Randomize question order and option order for exam mode.
///
/// Questions sharing a `group_id` move as one atomic block (internal order
/// untouched) so passage groups stay contiguous. Every question's options are
/// permuted independently and `correct_index` is remapped to follow the
/// correct option's new position. Study mode never calls this.
pub fn shuffle_questions(questions: &[Question]) -> Vec<Question> {
    shuffle_questions_with(questions, &mut rand::thread_rng())
}

/// Same as [`shuffle_questions`] but with a caller-supplied RNG, so tests can
/// seed it.
pub fn shuffle_questions_with<R: Rng>(questions: &[Question], rng: &mut R) -> Vec<Question> {
    let mut runs = partition_runs(questions);
    runs.shuffle(rng);

    let mut shuffled: Vec<Question> = runs.into_iter().flatten().collect();
    for question in &mut shuffled {
        shuffle_options(question, rng);
    }
    shuffled
}

/// Split the sequence into maximal contiguous runs: each ungrouped question is
/// its own run, each contiguous same-group block is one run. Source order is
/// expected to be group-contiguous already; a broken group simply yields more
/// runs and is never stitched back together here.
fn partition_runs(questions: &[Question]) -> Vec<Vec<Question>> {
    let mut runs: Vec<Vec<Question>> = Vec::new();

    for question in questions {
        let extends_open_run = match (&question.group_id, runs.last()) {
            (Some(group), Some(run)) => run
                .last()
                .and_then(|prev| prev.group_id.as_ref())
                .is_some_and(|prev_group| prev_group == group),
            _ => false,
        };

        if extends_open_run {
            runs.last_mut().expect("open run exists").push(question.clone());
        } else {
            runs.push(vec![question.clone()]);
        }
    }

    runs
}

fn shuffle_options<R: Rng>(question: &mut Question, rng: &mut R) {
    let mut permutation: Vec<usize> = (0..question.options.len()).collect();
    permutation.shuffle(rng);

    let reordered: Vec<String> = permutation
        .iter()
        .map(|&old_index| question.options[old_index].clone())
        .collect();
    let new_correct = permutation
        .iter()
        .position(|&old_index| old_index == question.correct_index)
        .expect("correct option survives permutation");

    question.options = reordered;
    question.correct_index = new_correct;
}
