use crate::grader::{
    error::AuthoringError,
    params::{ParamOverrides, Params},
    test::Test,
};

/// Settings of a new test group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupOptions {
    pub weight: f64,
    pub params: ParamOverrides,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            weight: 1.0,
            params: ParamOverrides::default(),
        }
    }
}

impl GroupOptions {
    #[must_use]
    pub fn weight(weight: f64) -> Self {
        Self {
            weight,
            ..Self::default()
        }
    }
}

/// Ordered tests and subgroups sharing a title and a weight.
#[derive(Debug, Clone)]
pub struct TestGroup {
    number: usize,
    title: String,
    weight: f64,
    params: Params,
    children: Vec<Node>,
    status: bool,
}

impl TestGroup {
    pub(crate) fn new(number: usize, title: String, weight: f64, params: Params) -> Self {
        Self {
            number,
            title,
            weight,
            params,
            children: Vec::new(),
            status: true,
        }
    }

    #[must_use]
    pub fn number(&self) -> usize {
        self.number
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    #[must_use]
    pub fn status(&self) -> bool {
        self.status
    }

    pub(crate) fn push(&mut self, child: Node) {
        self.status &= child.status();
        self.children.push(child);
    }

    /// `(Σ child grade / Σ child weight × weight, weight)`.
    pub fn get_grade(&self) -> Result<(f64, f64), AuthoringError> {
        let (total, weight) = sum_grades(&self.children)?;
        if weight <= 0.0 {
            return Err(AuthoringError::EmptyGroup(self.title.clone()));
        }
        Ok((total / weight * self.weight, self.weight))
    }
}

/// An entry of the session history.
#[derive(Debug, Clone)]
pub enum Node {
    Test(Test),
    Group(TestGroup),
}

impl Node {
    #[must_use]
    pub fn number(&self) -> usize {
        match self {
            Self::Test(test) => test.number(),
            Self::Group(group) => group.number(),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Test(test) => test.title(),
            Self::Group(group) => group.title(),
        }
    }

    #[must_use]
    pub fn weight(&self) -> f64 {
        match self {
            Self::Test(test) => test.weight(),
            Self::Group(group) => group.weight(),
        }
    }

    #[must_use]
    pub fn status(&self) -> bool {
        match self {
            Self::Test(test) => test.status(),
            Self::Group(group) => group.status(),
        }
    }

    pub fn get_grade(&self) -> Result<(f64, f64), AuthoringError> {
        match self {
            Self::Test(test) => Ok(test.get_grade()),
            Self::Group(group) => group.get_grade(),
        }
    }
}

/// Sums `(grade, weight)` over `nodes`.
pub(crate) fn sum_grades(nodes: &[Node]) -> Result<(f64, f64), AuthoringError> {
    nodes.iter().try_fold((0.0, 0.0), |(total, weight), node| {
        let (grade, node_weight) = node.get_grade()?;
        Ok((total + grade, weight + node_weight))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grader::test::TestOptions, namespace::Namespace};

    fn test_node(number: usize, weight: f64) -> Node {
        let options = TestOptions::new().weight(weight);
        Node::Test(Test::new(number, options, Params::default(), Namespace::new(), "submission.py"))
    }

    #[test]
    fn passing_group_grade_is_its_weight() {
        let mut group = TestGroup::new(1, "basics".to_owned(), 3.0, Params::default());
        group.push(test_node(1, 1.0));
        group.push(test_node(2, 2.0));
        assert_eq!(group.get_grade().unwrap(), (3.0, 3.0));
        assert!(group.status());
    }

    #[test]
    fn group_without_weight_is_an_error() {
        let group = TestGroup::new(1, "empty".to_owned(), 1.0, Params::default());
        assert_eq!(group.get_grade(), Err(AuthoringError::EmptyGroup("empty".to_owned())));
    }
}
