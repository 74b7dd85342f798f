use crate::question::Question;

/// One member question inside a passage group, carrying its position in the
/// flat question list and its hierarchical display label (e.g. "2.1").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub question_index: usize,
    pub label: String,
}

/// Layout descriptor derived from the flat question list: a singleton
/// question, or a passage group with shared context and labelled members.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Single {
        question_index: usize,
        label: String,
    },
    Group {
        group_id: String,
        context: Option<String>,
        members: Vec<GroupMember>,
    },
}

impl Entry {
    /// Flat indices of the questions this entry covers, in display order.
    pub fn question_indices(&self) -> Vec<usize> {
        match self {
            Entry::Single { question_index, .. } => vec![*question_index],
            Entry::Group { members, .. } => {
                members.iter().map(|m| m.question_index).collect()
            }
        }
    }

    pub fn contains(&self, question_index: usize) -> bool {
        self.question_indices().contains(&question_index)
    }
}

/// Display structure for the current question order.
///
/// `labels[i]` is the label of the question at flat position `i`. Labels are a
/// function of order, not stored state: recompute after every shuffle.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub entries: Vec<Entry>,
    pub labels: Vec<String>,
}

impl Projection {
    /// Index of the entry containing the given flat question position.
    pub fn entry_of(&self, question_index: usize) -> Option<usize> {
        self.entries.iter().position(|e| e.contains(question_index))
    }
}

/// Walk the sequence once, left to right, grouping contiguous same-`group_id`
/// questions under one top-level number and numbering everything else as a
/// singleton.
pub fn project(questions: &[Question]) -> Projection {
    let mut entries: Vec<Entry> = Vec::new();
    let mut labels: Vec<String> = Vec::with_capacity(questions.len());
    let mut top_level = 0usize;

    for (index, question) in questions.iter().enumerate() {
        match &question.group_id {
            None => {
                top_level += 1;
                let label = top_level.to_string();
                labels.push(label.clone());
                entries.push(Entry::Single {
                    question_index: index,
                    label,
                });
            }
            Some(group_id) => {
                let extends_open_group = matches!(
                    entries.last(),
                    Some(Entry::Group { group_id: open, .. }) if open == group_id
                );

                if extends_open_group {
                    if let Some(Entry::Group { members, .. }) = entries.last_mut() {
                        let label = format!("{}.{}", top_level, members.len() + 1);
                        labels.push(label.clone());
                        members.push(GroupMember {
                            question_index: index,
                            label,
                        });
                    }
                } else {
                    top_level += 1;
                    let label = format!("{}.1", top_level);
                    labels.push(label.clone());
                    entries.push(Entry::Group {
                        group_id: group_id.clone(),
                        context: question.context.clone(),
                        members: vec![GroupMember {
                            question_index: index,
                            label,
                        }],
                    });
                }
            }
        }
    }

    Projection { entries, labels }
}
