/// Node handle in a [`FlowNetwork`].
pub type NodeId = usize;

/// Edge handle in a [`FlowNetwork`]; always refers to the forward direction.
pub type EdgeId = usize;

/// A directed flow network stored as flat arrays.
///
/// Every call to [`FlowNetwork::add_edge`] appends a forward/reverse pair of
/// arcs, so arc `e` and arc `e ^ 1` are each other's residual partner.
/// Adjacency lists keep insertion order, which is what makes the augmenting
/// search deterministic for a given construction order.
#[derive(Debug, Clone, Default)]
pub struct FlowNetwork {
    adj: Vec<Vec<usize>>,
    head: Vec<NodeId>,
    cap: Vec<f64>,
    flow: Vec<f64>,
}

impl FlowNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self) -> NodeId {
        self.adj.push(Vec::new());
        self.adj.len() - 1
    }

    pub fn node_count(&self) -> usize {
        self.adj.len()
    }

    /// Add a directed edge with the given capacity and return its handle.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, capacity: f64) -> EdgeId {
        let id = self.head.len();
        self.head.push(to);
        self.cap.push(capacity);
        self.flow.push(0.0);
        self.adj[from].push(id);

        self.head.push(from);
        self.cap.push(0.0);
        self.flow.push(0.0);
        self.adj[to].push(id + 1);

        id
    }

    /// Current flow on the forward direction of an edge.
    pub fn flow(&self, edge: EdgeId) -> f64 {
        self.flow[edge]
    }

    /// Remaining forward capacity of an arc.
    pub fn residual(&self, arc: usize) -> f64 {
        self.cap[arc] - self.flow[arc]
    }

    /// Pin an edge at its current flow: neither direction keeps residual
    /// capacity, so later augmentation passes cannot route through it.
    pub fn freeze_edge(&mut self, edge: EdgeId) {
        self.cap[edge] = self.flow[edge];
        self.cap[edge ^ 1] = self.flow[edge ^ 1];
    }

    pub(crate) fn arcs_from(&self, node: NodeId) -> &[usize] {
        &self.adj[node]
    }

    pub(crate) fn arc_head(&self, arc: usize) -> NodeId {
        self.head[arc]
    }

    pub(crate) fn push(&mut self, arc: usize, amount: f64) {
        self.flow[arc] += amount;
        self.flow[arc ^ 1] -= amount;
    }
}
